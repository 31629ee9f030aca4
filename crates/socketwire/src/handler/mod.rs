//! Functions and types used to handle incoming events and channel lifecycle.
//! There is three kinds of handlers: [connect], [message] and [disconnect].
//! All handlers can be async or not.
//!
//! Handlers are stored in a [`HandlerRegistry`] shared by every channel of an
//! [`Engine`](crate::Engine). Message handlers of one channel run one at a
//! time, in the order their events arrived.
#[rustfmt::skip]
macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!([]);
        $name!([T1]);
        $name!([T1, T2]);
        $name!([T1, T2, T3]);
        $name!([T1, T2, T3, T4]);
        $name!([T1, T2, T3, T4, T5]);
        $name!([T1, T2, T3, T4, T5, T6]);
        $name!([T1, T2, T3, T4, T5, T6, T7]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8]);
    };
}

pub mod connect;
pub mod disconnect;
pub mod message;
mod registry;

pub use connect::{ConnectHandler, FromConnectParts};
pub use disconnect::{DisconnectHandler, FromDisconnectParts};
pub use message::{FromMessageParts, MessageHandler, MessageParts};
pub use registry::HandlerRegistry;

/// A struct used to erase the type of a handler so it can be stored in a map
pub(crate) struct MakeErasedHandler<H, T> {
    handler: H,
    type_: std::marker::PhantomData<T>,
}
impl<H, T> MakeErasedHandler<H, T> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            type_: std::marker::PhantomData,
        }
    }
}

mod private {
    #[derive(Debug, Clone, Copy)]
    pub enum Sync {}
    #[derive(Debug, Clone, Copy)]
    pub enum Async {}
}
