//! [`ConnectHandler`] trait and implementations, used to run code once a channel
//! completed its handshake.
//!
//! On a client channel it fires when the peer's open packet arrives, on a
//! server channel right after the open packet has been queued. It runs on the
//! dispatch loop, before any message handler of the channel.
//!
//! ## Example
//! ```rust
//! # use socketwire::Engine;
//! # use socketwire::extract::*;
//! let engine = Engine::new();
//! engine.on_connect(async |s: SocketRef| {
//!     s.emit("hello", "world").ok();
//! });
//! ```
use std::{future::Future, sync::Arc};

use futures_core::future::BoxFuture;

use super::{MakeErasedHandler, private};
use crate::channel::Channel;

pub(crate) type BoxedConnectHandler = Arc<dyn ErasedConnectHandler>;

pub(crate) trait ErasedConnectHandler: Send + Sync + 'static {
    fn call(&self, s: Arc<Channel>) -> Option<BoxFuture<'static, ()>>;
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: ConnectHandler<T>,
{
    pub fn new_connect_boxed(inner: H) -> BoxedConnectHandler {
        Arc::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedConnectHandler for MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: ConnectHandler<T>,
{
    #[inline(always)]
    fn call(&self, s: Arc<Channel>) -> Option<BoxFuture<'static, ()>> {
        self.handler.call(s)
    }
}

/// A trait used to extract the arguments of a connect handler.
/// If it fails, the handler is not called.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid connect extractor.\nSee the `socketwire::extract` module for details",
    label = "Invalid extractor"
)]
pub trait FromConnectParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the connected channel.
    fn from_connect_parts(s: &Arc<Channel>) -> Result<Self, Self::Error>;
}

/// Define a handler for the connect event.
/// It is implemented for closures with up to 8 arguments that all implement [`FromConnectParts`].
#[diagnostic::on_unimplemented(
    note = "This function is not a ConnectHandler. Check that:
* It is a clonable `FnOnce` that returns nothing, sync or async.
* All its arguments are valid connect extractors.",
    label = "Invalid ConnectHandler"
)]
pub trait ConnectHandler<T>: Send + Sync + 'static {
    /// Runs the extractors and returns the handler invocation as a future.
    fn call(&self, s: Arc<Channel>) -> Option<BoxFuture<'static, ()>>;

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
        impl<F, $($ty,)*> ConnectHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) + Send + Sync + Clone + 'static,
            $( $ty: FromConnectParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_connect_parts(&s) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting connect args: {}", s.local_id(), _e);
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
        impl<F, Fut, $($ty,)*> ConnectHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $( $ty: FromConnectParts + Send + 'static, )*
        {
            fn call(&self, s: Arc<Channel>) -> Option<BoxFuture<'static, ()>> {
                $(
                    let $ty = match $ty::from_connect_parts(&s) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("[sid={}] error while extracting connect args: {}", s.local_id(), _e);
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
