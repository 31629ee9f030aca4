//! [`MessageHandler`] trait and implementations, used to handle the message events.
//! It has a flexible axum-like API, you can put any arguments as long as it implements
//! the [`FromMessageParts`] trait.
//!
//! Handlers can be _sync_ or _async_. An async handler runs to completion before
//! the next event of the same channel is handled.
//!
//! ## Example with sync closures
//! ```rust
//! # use socketwire::Engine;
//! # use socketwire::extract::*;
//! let engine = Engine::new();
//! engine
//!     .on("echo", |s: SocketRef, Data(data): Data<serde_json::Value>| {
//!         s.emit("echo-reply", &data).ok();
//!     })
//!     .unwrap();
//! ```
//!
//! ## Example with async handlers and acknowledgements
//! ```rust
//! # use socketwire::Engine;
//! # use socketwire::extract::*;
//! async fn on_event(Data(data): Data<String>, ack: AckSender) {
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     ack.send(&format!("got {data}")).ok();
//! }
//! let engine = Engine::new();
//! engine.on("event", on_event).unwrap();
//! // Handlers can be reused
//! engine.on("event_2", on_event).unwrap();
//! ```
use std::{future::Future, sync::Arc};

use bytes::Bytes;
use futures_core::future::BoxFuture;
use socketwire_core::Message;

use super::{MakeErasedHandler, private};
use crate::channel::Channel;

/// The pieces of a received event handed to the extractors.
#[derive(Debug, Clone, Default)]
pub struct MessageParts {
    /// The method (event) name.
    pub event: String,
    /// The raw json arguments.
    pub args: String,
    /// The reassembled binary attachments.
    pub binary: Bytes,
    /// The ack id if the peer expects a reply.
    pub ack_id: Option<i64>,
}

impl From<Message> for MessageParts {
    fn from(msg: Message) -> Self {
        Self {
            event: msg.method,
            args: msg.args,
            binary: msg.binary.freeze(),
            ack_id: msg.ack_id,
        }
    }
}

/// A Type Erased [`MessageHandler`] so it can be stored in a HashMap
pub(crate) type BoxedMessageHandler = Arc<dyn ErasedMessageHandler>;

pub(crate) trait ErasedMessageHandler: Send + Sync + 'static {
    fn call(&self, s: Arc<Channel>, parts: MessageParts) -> Option<BoxFuture<'static, ()>>;
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: MessageHandler<T>,
{
    pub fn new_message_boxed(inner: H) -> BoxedMessageHandler {
        Arc::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedMessageHandler for MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: MessageHandler<T>,
{
    #[inline(always)]
    fn call(&self, s: Arc<Channel>, parts: MessageParts) -> Option<BoxFuture<'static, ()>> {
        self.handler.call(s, parts)
    }
}

/// Define a handler for a message event.
/// It is implemented for closures with up to 8 arguments that all implement [`FromMessageParts`].
///
/// * See the [`message`](super::message) module doc for more details on message handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid socketwire extractor.\nSee the `socketwire::extract` module for details",
    label = "Invalid MessageHandler"
)]
pub trait MessageHandler<T>: Send + Sync + 'static {
    /// Runs the extractors and returns the handler invocation as a future.
    /// Returns `None` if an extractor failed, in which case the handler is not called.
    fn call(&self, s: Arc<Channel>, parts: MessageParts) -> Option<BoxFuture<'static, ()>>;

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

/// A trait used to extract arguments from the message event.
/// The `Result` associated type is used to return an error if the extraction fails, in this case the handler is not called.
///
/// * See the [`message`](super::message) module doc for more details on message handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid socketwire extractor.\nSee the `socketwire::extract` module for details",
    label = "Invalid extractor"
)]
pub trait FromMessageParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the message event.
    /// If it fails, the handler is not called.
    fn from_message_parts(s: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Self::Error>;
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused)]
        impl<F, $($ty,)*> MessageHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) + Send + Sync + Clone + 'static,
            $( $ty: FromMessageParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>, mut parts: MessageParts) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_message_parts(&s, &mut parts) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting {} args: {}", s.local_id(), parts.event, _e);
                            return None;
                        },
                    };
                )*
                let handler = self.clone();
                Some(Box::pin(async move { handler($($ty,)*) }))
            }
        }
    };
}

macro_rules! impl_async_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused)]
        impl<F, Fut, $($ty,)*> MessageHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $( $ty: FromMessageParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>, mut parts: MessageParts) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_message_parts(&s, &mut parts) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting {} args: {}", s.local_id(), parts.event, _e);
                            return None;
                        },
                    };
                )*
                let handler = self.clone();
                Some(Box::pin(async move { handler($($ty,)*).await }))
            }
        }
    };
}

all_the_tuples!(impl_handler);
all_the_tuples!(impl_async_handler);
