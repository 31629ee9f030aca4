use crate::channel::DisconnectReason;

pub use crate::transport::TransportError;
pub use socketwire_core::{DecodeError, EncodeError};

/// Error type for the duty loops of a channel. It always ends the channel.
#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("error decoding packet: {0}")]
    Decode(#[from] DecodeError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("binary frame received where a text packet was expected")]
    UnexpectedBinary,
    #[error("text frame received where a binary attachment was expected")]
    MissingBinary,
    #[error("peer closed the session")]
    PeerClose,
    #[error("outbound queue overflow")]
    Overflow,
    #[error("dispatch backlog overflow")]
    DispatchOverflow,
}

impl From<&Error> for DisconnectReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::Decode(_) | Error::UnexpectedBinary | Error::MissingBinary => {
                DisconnectReason::PacketParsingError
            }
            Error::Transport(TransportError::Closed) | Error::PeerClose => {
                DisconnectReason::TransportClose
            }
            Error::Transport(_) => DisconnectReason::TransportError,
            Error::Overflow | Error::DispatchOverflow => DisconnectReason::Overflow,
        }
    }
}

/// Error type when using the underlying channel of a session.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    /// The outbound queue is full. The channel is closed shortly after.
    #[error("internal channel full error")]
    InternalChannelFull,

    /// The channel is already closed.
    #[error("socket closed")]
    Closed,
}

/// Error type for sending operations.
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// The arguments cannot be serialized to json.
    #[error("error serializing arguments: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The message cannot be encoded.
    #[error("error encoding packet: {0}")]
    Encode(#[from] EncodeError),

    /// The message cannot be queued on the channel.
    #[error("error sending data through the channel: {0}")]
    Socket(#[from] SocketError),
}

/// Error type for ack operations.
#[derive(thiserror::Error, Debug)]
pub enum AckError {
    /// No reply came back in time.
    #[error("ack timeout error")]
    Timeout,

    /// The channel closed while waiting for the reply.
    #[error("error sending data through the channel: {0}")]
    Socket(#[from] SocketError),

    /// The request could not be sent.
    #[error("error sending ack request: {0}")]
    Send(#[from] SendError),

    /// The reply cannot be deserialized into the expected type.
    #[error("cannot deserialize ack response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A waiter is already registered for this ack id.
    #[error("an ack waiter is already registered for id {0}")]
    DuplicateId(i64),
}

/// Error type for handler registration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The event name is empty.
    #[error("event name cannot be empty")]
    EmptyEvent,

    /// The event name is reserved for lifecycle handlers.
    #[error("event name {0:?} is reserved, use on_connect / on_disconnect")]
    ReservedEvent(String),
}
