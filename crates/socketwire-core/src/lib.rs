#![warn(
    clippy::all,
    clippy::todo,
    clippy::empty_enum,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::await_holding_lock,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_docs
)]

//! Wire types for the socketwire session engine.
//!
//! This crate holds the pieces that do not need a runtime: the text codec for
//! Engine.IO v3/v4 packets with their Socket.IO payloads ([`decode`] and
//! [`encode`]), the decoded [`Message`], the handshake [`OpenHeader`] and the
//! session id type [`Sid`].
//!
//! ```
//! use socketwire_core::{Message, PacketKind, decode, encode};
//!
//! let msg = decode(r#"42["echo","[1,2,3]"]"#).unwrap();
//! assert_eq!(msg.kind, PacketKind::Event);
//! assert_eq!(msg.method, "echo");
//!
//! let reply = Message::event("echo-reply", "[1,2,3]");
//! assert_eq!(encode(&reply).unwrap(), r#"42["echo-reply",[1,2,3]]"#);
//! ```

mod de;
mod errors;
mod header;
mod message;
mod ser;
mod sid;

pub use de::decode;
pub use errors::{DecodeError, EncodeError};
pub use header::OpenHeader;
pub use message::{Message, PacketKind};
pub use ser::encode;
pub use sid::{Sid, SidParseError};
