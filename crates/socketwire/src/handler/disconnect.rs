//! [`DisconnectHandler`] trait and implementations, used to handle the disconnect event.
//! It has a flexible axum-like API, you can put any arguments as long as it implements the [`FromDisconnectParts`] trait.
//!
//! The handler is called exactly once per channel, after the channel is marked
//! as closed, so it can still read its state but cannot send anymore.
//!
//! ## Example
//! ```rust
//! # use socketwire::{Engine, DisconnectReason};
//! # use socketwire::extract::*;
//! async fn handler(s: SocketRef, reason: DisconnectReason) {
//!     println!("channel {} closed: {}", s.local_id(), reason);
//! }
//!
//! let engine = Engine::new();
//! engine.on_disconnect(handler);
//! ```
use std::{future::Future, sync::Arc};

use futures_core::future::BoxFuture;

use super::{MakeErasedHandler, private};
use crate::channel::{Channel, DisconnectReason};

pub(crate) type BoxedDisconnectHandler = Arc<dyn ErasedDisconnectHandler>;

pub(crate) trait ErasedDisconnectHandler: Send + Sync + 'static {
    fn call(&self, s: Arc<Channel>, reason: DisconnectReason) -> Option<BoxFuture<'static, ()>>;
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: DisconnectHandler<T>,
{
    pub fn new_disconnect_boxed(inner: H) -> BoxedDisconnectHandler {
        Arc::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedDisconnectHandler for MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: DisconnectHandler<T>,
{
    #[inline(always)]
    fn call(&self, s: Arc<Channel>, reason: DisconnectReason) -> Option<BoxFuture<'static, ()>> {
        self.handler.call(s, reason)
    }
}

/// A trait used to extract the arguments from the disconnect event.
/// The `Result` associated type is used to return an error if the extraction fails,
/// in this case the handler is not called.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid disconnect extractor.\nSee the `socketwire::extract` module for details",
    label = "Invalid extractor"
)]
pub trait FromDisconnectParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the disconnect event.
    /// If it fails, the handler is not called
    fn from_disconnect_parts(s: &Arc<Channel>, reason: DisconnectReason)
    -> Result<Self, Self::Error>;
}

/// Define a handler for the disconnect event.
/// It is implemented for closures with up to 8 arguments that all implement [`FromDisconnectParts`].
#[diagnostic::on_unimplemented(
    note = "This function is not a DisconnectHandler. Check that:
* It is a clonable `FnOnce` that returns nothing, sync or async.
* All its arguments are valid disconnect extractors.",
    label = "Invalid DisconnectHandler"
)]
pub trait DisconnectHandler<T>: Send + Sync + 'static {
    /// Runs the extractors and returns the handler invocation as a future.
    fn call(&self, s: Arc<Channel>, reason: DisconnectReason) -> Option<BoxFuture<'static, ()>>;

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused)]
        impl<F, $($ty,)*> DisconnectHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) + Send + Sync + Clone + 'static,
            $( $ty: FromDisconnectParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>, reason: DisconnectReason) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_disconnect_parts(&s, reason) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting disconnect args: {}", s.local_id(), _e);
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
        impl<F, Fut, $($ty,)*> DisconnectHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $( $ty: FromDisconnectParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>, reason: DisconnectReason) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_disconnect_parts(&s, reason) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting disconnect args: {}", s.local_id(), _e);
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
