use std::{
    borrow::Cow,
    collections::HashMap,
    sync::{Arc, RwLock},
};

use futures_core::future::BoxFuture;

use super::{
    ConnectHandler, DisconnectHandler, MakeErasedHandler, MessageHandler, MessageParts,
    connect::BoxedConnectHandler, disconnect::BoxedDisconnectHandler,
    message::BoxedMessageHandler,
};
use crate::{
    channel::{Channel, DisconnectReason},
    errors::RegistryError,
};

/// Event names that can only be handled through lifecycle handlers.
const RESERVED_EVENTS: [&str; 2] = ["connection", "disconnection"];

/// The method name to handler table, plus the lifecycle handlers.
///
/// Handlers may be registered at any time, also while channels are running.
/// A lookup only holds the lock long enough to clone the handler out, so a
/// running handler can register other handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    message_handlers: RwLock<HashMap<Cow<'static, str>, BoxedMessageHandler>>,
    connect_handler: RwLock<Option<BoxedConnectHandler>>,
    disconnect_handler: RwLock<Option<BoxedDisconnectHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler of `event`, replacing any previous one.
    pub fn on<H, T>(&self, event: impl Into<Cow<'static, str>>, handler: H) -> Result<(), RegistryError>
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        let event = event.into();
        if event.is_empty() {
            return Err(RegistryError::EmptyEvent);
        }
        if RESERVED_EVENTS.contains(&event.as_ref()) {
            return Err(RegistryError::ReservedEvent(event.into_owned()));
        }
        self.message_handlers
            .write()
            .unwrap()
            .insert(event, MakeErasedHandler::new_message_boxed(handler));
        Ok(())
    }

    /// Removes the handler of `event`. Later events with this name are dropped.
    pub fn off(&self, event: &str) {
        self.message_handlers.write().unwrap().remove(event);
    }

    /// Whether a handler is registered for `event`.
    pub fn contains(&self, event: &str) -> bool {
        self.message_handlers.read().unwrap().contains_key(event)
    }

    /// Registers the connect handler, replacing any previous one.
    pub fn on_connect<H, T>(&self, handler: H)
    where
        H: ConnectHandler<T>,
        T: Send + Sync + 'static,
    {
        let handler = MakeErasedHandler::new_connect_boxed(handler);
        self.connect_handler.write().unwrap().replace(handler);
    }

    /// Registers the disconnect handler, replacing any previous one.
    pub fn on_disconnect<H, T>(&self, handler: H)
    where
        H: DisconnectHandler<T>,
        T: Send + Sync + 'static,
    {
        let handler = MakeErasedHandler::new_disconnect_boxed(handler);
        self.disconnect_handler.write().unwrap().replace(handler);
    }

    pub(crate) fn message(&self, s: &Arc<Channel>, parts: MessageParts) -> Option<BoxFuture<'static, ()>> {
        let handler = self.message_handlers.read().unwrap().get(parts.event.as_str()).cloned();
        match handler {
            Some(handler) => handler.call(s.clone(), parts),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("[sid={}] no handler for {:?}, message dropped", s.local_id(), parts.event);
                None
            }
        }
    }

    pub(crate) fn connect(&self, s: &Arc<Channel>) -> Option<BoxFuture<'static, ()>> {
        let handler = self.connect_handler.read().unwrap().clone();
        handler?.call(s.clone())
    }

    pub(crate) fn disconnect(
        &self,
        s: &Arc<Channel>,
        reason: DisconnectReason,
    ) -> Option<BoxFuture<'static, ()>> {
        let handler = self.disconnect_handler.read().unwrap().clone();
        handler?.call(s.clone(), reason)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<_> = self
            .message_handlers
            .read()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        f.debug_struct("HandlerRegistry")
            .field("events", &events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_reserved_names() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.on("", || ()), Err(RegistryError::EmptyEvent));
        assert_eq!(
            registry.on("connection", || ()),
            Err(RegistryError::ReservedEvent("connection".into()))
        );
        assert_eq!(
            registry.on("disconnection", async || ()),
            Err(RegistryError::ReservedEvent("disconnection".into()))
        );
        assert!(!registry.contains("connection"));
    }

    #[test]
    fn register_replace_and_remove() {
        let registry = HandlerRegistry::new();
        registry.on("echo", || ()).unwrap();
        registry.on(String::from("echo"), async || ()).unwrap();
        assert!(registry.contains("echo"));
        registry.off("echo");
        assert!(!registry.contains("echo"));
    }
}
