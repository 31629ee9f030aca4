use crate::PacketKind;

/// Error returned when a wire packet cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The packet is empty.
    #[error("empty packet")]
    Empty,
    /// The packet is not valid utf8.
    #[error("packet is not valid utf8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The type prefix is unknown. `None` when the `4` prefix has no sub-type.
    #[error("invalid packet type {0:?}")]
    InvalidPacketType(Option<char>),
    /// The binary attachment count is missing or not followed by `-`.
    #[error("invalid binary attachment count")]
    InvalidAttachments,
    /// The ack id is not a number.
    #[error("invalid ack id")]
    InvalidAckId,
    /// An ack reply carries no ack id.
    #[error("missing ack id")]
    MissingAckId,
    /// No `[` opens the payload.
    #[error("missing payload")]
    MissingPayload,
    /// The payload is not a `[method, args]` json array.
    #[error("invalid payload: {0}")]
    InvalidPayload(serde_json::Error),
    /// The ack reply payload is not wrapped in brackets.
    #[error("malformed ack payload")]
    MalformedAckPayload,
    /// A packet of another kind was found where an open packet was expected.
    #[error("expected an open packet, got {0:?}")]
    NotOpen(PacketKind),
    /// The open header json is invalid.
    #[error("invalid open header: {0}")]
    InvalidHeader(serde_json::Error),
}

/// Error returned when a [`Message`](crate::Message) cannot be encoded.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The message kind requires an ack id.
    #[error("{0:?} packet requires an ack id")]
    MissingAckId(PacketKind),
    /// The method name cannot be serialized as a json string.
    #[error("cannot serialize method name: {0}")]
    Method(#[from] serde_json::Error),
}
