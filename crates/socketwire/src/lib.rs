#![cfg_attr(docsrs, feature(doc_cfg))]
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
//! Socketwire is an Engine.IO / Socket.IO session engine for both ends of a
//! connection. It runs over any duplex transport, a websocket one is included.
//!
//! ## Table of contents
//! * [Features](#features)
//! * [Usage](#usage)
//! * [Handlers](#handlers)
//! * [Emiting data](#emiting-data)
//! * [Acknowledgements](#acknowledgements)
//! * [Closing and backpressure](#closing-and-backpressure)
//! * [Feature flags](#feature-flags)
//!
//! ## Features
//! * Client and server roles over the same [`Channel`] type
//! * Easy to use axum-like handlers with [extractors](extract)
//! * Acknowledgements in both directions
//! * Binary attachments
//! * Engine.IO v3 and v4 binary framing
//! * Pluggable [transports](transport), with a websocket and an in-memory one
//! * Slow consumer tracking through the [`BackpressureTracker`]
//!
//! ## Usage
//! An [`Engine`] holds the handlers and the config shared by its channels.
//! It creates client channels with [`Engine::connect`] or [`Engine::dial`] and
//! server channels with [`Engine::accept`].
//!
//! ```no_run
//! use socketwire::{Engine, extract::{Data, SocketRef}, transport::ws};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new();
//!     engine.on("echo", |s: SocketRef, Data::<serde_json::Value>(data)| {
//!         s.emit("echo-reply", &data).ok();
//!     })?;
//!
//!     let listener = TcpListener::bind("0.0.0.0:3000").await?;
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let (transport, remote) = ws::accept(stream, Default::default()).await?;
//!         engine.accept(transport, remote)?;
//!     }
//! }
//! ```
//!
//! ## Handlers
//! Message handlers are registered per method name with [`Engine::on`].
//! Lifecycle handlers are registered with [`Engine::on_connect`] and
//! [`Engine::on_disconnect`]. Handlers can be sync or async closures whose
//! arguments are [extractors](extract).
//!
//! The handlers of one channel run one at a time, in the order their events
//! arrived. An event for an unknown method or with arguments that cannot be
//! extracted is dropped, and a panicking handler only ends itself.
//!
//! ## Emiting data
//! [`Channel::emit`] and [`Channel::emit_binary`] queue an event on the
//! channel. They never wait for the network and fail once the outbound queue
//! is full or the channel is closed.
//!
//! ## Acknowledgements
//! [`Channel::ack`] sends an ack request and waits for the raw reply,
//! [`Channel::emit_with_ack`] does the same with the configured timeout and
//! deserializes the reply. Requests coming from the peer are answered with
//! the [`AckSender`](extract::AckSender) extractor.
//!
//! ## Closing and backpressure
//! A channel closes once, for the first of these reasons: the peer closes it,
//! the transport fails, the peer sends an invalid packet, the outbound queue
//! overflows or [`Channel::close`] is called. See [`DisconnectReason`].
//!
//! Channels whose outbound queue is more than half full are tracked by the
//! [`BackpressureTracker`] of their engine.
//!
//! ## Feature flags
//! * `tracing`: enables logs with the [`tracing`](https://docs.rs/tracing) crate. Enabled by default.
pub mod extract;
pub mod handler;
pub mod transport;

pub use backpressure::BackpressureTracker;
pub use channel::{Channel, DisconnectReason, RemoteInfo, Role};
pub use config::{EngineConfig, ProtocolVersion, UnknownProtocolVersionError};
pub use engine::{Engine, EngineBuilder};
pub use errors::{
    AckError, DecodeError, EncodeError, RegistryError, SendError, SocketError, TransportError,
};
pub use socketwire_core::{Message, OpenHeader, PacketKind, Sid};

mod ack;
mod backpressure;
mod channel;
mod config;
mod engine;
mod errors;
mod queue;
