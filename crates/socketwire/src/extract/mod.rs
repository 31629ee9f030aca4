//! ### Extractors for [`ConnectHandler`], [`MessageHandler`] and [`DisconnectHandler`].
//!
//! They can be used to extract data from the context of the handler and get specific params:
//! * [`Data`]: deserializes the event arguments, if a deserialization error occurs the handler won't be called.
//! * [`TryData`]: deserializes the event arguments but hands a `Result` to the handler.
//! * [`Bin`]: the reassembled binary attachments of the event.
//! * [`Event`]: the method name of the event.
//! * [`SocketRef`]: a reference to the [`Channel`](crate::Channel).
//! * [`AckSender`]: sends an ack response to the current event.
//! * [`ProtocolVersion`](crate::ProtocolVersion): the protocol version of the channel.
//! * [`DisconnectReason`](crate::DisconnectReason): the reason of the disconnection.
//!
//! A handler without [`Data`] or [`TryData`] simply ignores the event arguments.
//!
//! ### You can also implement your own Extractor!
//! Implement the [`FromConnectParts`], [`FromMessageParts`] and [`FromDisconnectParts`] traits
//! on any type to extract data from the context of the handler.
//!
//! [`FromConnectParts`]: crate::handler::FromConnectParts
//! [`FromMessageParts`]: crate::handler::FromMessageParts
//! [`FromDisconnectParts`]: crate::handler::FromDisconnectParts
//! [`ConnectHandler`]: crate::handler::ConnectHandler
//! [`MessageHandler`]: crate::handler::MessageHandler
//! [`DisconnectHandler`]: crate::handler::DisconnectHandler
//!
//! #### Example of a custom extractor
//! ```rust
//! # use std::{convert::Infallible, sync::Arc};
//! # use socketwire::{Channel, Engine, handler::{FromMessageParts, MessageParts}};
//! struct ArgsLen(usize);
//!
//! impl FromMessageParts for ArgsLen {
//!     type Error = Infallible;
//!     fn from_message_parts(_: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Infallible> {
//!         Ok(ArgsLen(parts.args.len()))
//!     }
//! }
//!
//! let engine = Engine::new();
//! engine.on("measure", |ArgsLen(len): ArgsLen| println!("{len} bytes of args")).unwrap();
//! ```
mod data;
mod socket;

pub use data::*;
pub use socket::*;

pub(crate) use data::decode_args;

/// Private API.
#[doc(hidden)]
macro_rules! __impl_deref {
    ($ident:ident) => {
        impl<T> std::ops::Deref for $ident<T> {
            type Target = T;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<T> std::ops::DerefMut for $ident<T> {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };

    ($ident:ident<$($gen:ident),+>: $ty:ty) => {
        impl<$($gen),+> std::ops::Deref for $ident<$($gen),+> {
            type Target = $ty;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<$($gen),+> std::ops::DerefMut for $ident<$($gen),+> {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };

    ($ident:ident: $ty:ty) => {
        impl std::ops::Deref for $ident {
            type Target = $ty;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $ident {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}
pub(crate) use __impl_deref;
