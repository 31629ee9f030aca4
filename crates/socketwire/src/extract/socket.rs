use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use socketwire_core::Message;

use crate::{
    ProtocolVersion,
    channel::{Channel, DisconnectReason},
    errors::SendError,
    handler::{FromConnectParts, FromDisconnectParts, FromMessageParts, MessageParts},
};

/// An Extractor that returns a reference to a [`Channel`].
#[derive(Debug, Clone)]
pub struct SocketRef(Arc<Channel>);

impl FromConnectParts for SocketRef {
    type Error = Infallible;
    fn from_connect_parts(s: &Arc<Channel>) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}
impl FromMessageParts for SocketRef {
    type Error = Infallible;
    fn from_message_parts(s: &Arc<Channel>, _: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}
impl FromDisconnectParts for SocketRef {
    type Error = Infallible;
    fn from_disconnect_parts(s: &Arc<Channel>, _: DisconnectReason) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}

impl std::ops::Deref for SocketRef {
    type Target = Channel;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl PartialEq for SocketRef {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.0.local_id() == other.0.local_id()
    }
}
impl From<Arc<Channel>> for SocketRef {
    #[inline(always)]
    fn from(channel: Arc<Channel>) -> Self {
        Self(channel)
    }
}

impl SocketRef {
    /// The underlying channel handle.
    pub fn channel(&self) -> &Arc<Channel> {
        &self.0
    }
}

/// An Extractor to send an ack response corresponding to the current event.
/// If the peer sent a normal message without expecting an ack, the ack callback will do nothing.
#[derive(Debug)]
pub struct AckSender {
    socket: Arc<Channel>,
    ack_id: Option<i64>,
}
impl FromMessageParts for AckSender {
    type Error = Infallible;
    fn from_message_parts(s: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(Self::new(s.clone(), parts.ack_id))
    }
}
impl AckSender {
    pub(crate) fn new(socket: Arc<Channel>, ack_id: Option<i64>) -> Self {
        Self { socket, ack_id }
    }

    /// Whether the peer expects a reply.
    pub fn is_expected(&self) -> bool {
        self.ack_id.is_some()
    }

    /// Send the ack response to the peer as `43<id>[<data>]`.
    pub fn send<T: Serialize + ?Sized>(self, data: &T) -> Result<(), SendError> {
        let Some(ack_id) = self.ack_id else {
            return Ok(());
        };
        let args = serde_json::to_string(data)?;
        self.socket.send(&Message::ack_response(ack_id, args), None)
    }
}

/// An Extractor that returns the method name of the current event.
/// Useful when one handler is registered for several events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event(pub String);

impl FromMessageParts for Event {
    type Error = Infallible;
    fn from_message_parts(_: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(Event(parts.event.clone()))
    }
}

impl FromConnectParts for ProtocolVersion {
    type Error = Infallible;
    fn from_connect_parts(s: &Arc<Channel>) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}
impl FromMessageParts for ProtocolVersion {
    type Error = Infallible;
    fn from_message_parts(s: &Arc<Channel>, _: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}
impl FromDisconnectParts for ProtocolVersion {
    type Error = Infallible;
    fn from_disconnect_parts(s: &Arc<Channel>, _: DisconnectReason) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}

impl FromDisconnectParts for DisconnectReason {
    type Error = Infallible;
    fn from_disconnect_parts(_: &Arc<Channel>, reason: DisconnectReason) -> Result<Self, Infallible> {
        Ok(reason)
    }
}
