use bytes::{Bytes, BytesMut};

/// The kind of a wire message.
///
/// The first five variants are transport-level Engine.IO packets, the rest are
/// Socket.IO packets carried inside an Engine.IO `message` (prefix `4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// `0`: handshake, carries the [`OpenHeader`](crate::OpenHeader) json.
    Open,
    /// `1`: transport close.
    Close,
    /// `2`: heartbeat request.
    Ping,
    /// `3`: heartbeat answer.
    Pong,
    /// `40`: namespace connect.
    Connect,
    /// `41`: namespace disconnect.
    Disconnect,
    /// `42`: event without ack.
    Event,
    /// `42<id>`: event expecting an ack.
    AckRequest,
    /// `43<id>`: ack reply.
    AckResponse,
    /// `45<n>-[<id>]`: event followed by `n` binary frames.
    BinaryEvent,
    /// `46<n>-<id>`: ack reply followed by `n` binary frames.
    BinaryAck,
}

impl PacketKind {
    /// Whether messages of this kind carry a method name and are routed to a handler.
    pub fn is_event(self) -> bool {
        matches!(
            self,
            PacketKind::Event | PacketKind::AckRequest | PacketKind::BinaryEvent
        )
    }

    /// Whether messages of this kind answer a pending ack request.
    pub fn is_ack_response(self) -> bool {
        matches!(self, PacketKind::AckResponse | PacketKind::BinaryAck)
    }

    /// Whether messages of this kind announce trailing binary frames.
    pub fn has_attachments(self) -> bool {
        matches!(self, PacketKind::BinaryEvent | PacketKind::BinaryAck)
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The message kind.
    pub kind: PacketKind,
    /// The ack id of ack requests and ack replies.
    pub ack_id: Option<i64>,
    /// The method (event) name, empty for non-event kinds.
    pub method: String,
    /// The raw json arguments.
    ///
    /// For events this is the second array element, for ack replies the text
    /// between the outer brackets, for open packets the header json.
    pub args: String,
    /// The raw text the message was decoded from.
    pub source: Bytes,
    /// Concatenated binary attachments.
    pub binary: BytesMut,
    /// The number of binary frames announced by the text packet.
    pub attachments: usize,
    received: usize,
}

impl Message {
    /// Creates an empty message of the given kind.
    pub fn new(kind: PacketKind) -> Self {
        Self {
            kind,
            ack_id: None,
            method: String::new(),
            args: String::new(),
            source: Bytes::new(),
            binary: BytesMut::new(),
            attachments: 0,
            received: 0,
        }
    }

    /// A heartbeat request.
    pub fn ping() -> Self {
        Self::new(PacketKind::Ping)
    }

    /// A heartbeat answer.
    pub fn pong() -> Self {
        Self::new(PacketKind::Pong)
    }

    /// A namespace connect packet. `args` may be empty.
    pub fn connect(args: impl Into<String>) -> Self {
        Self {
            args: args.into(),
            ..Self::new(PacketKind::Connect)
        }
    }

    /// A namespace disconnect packet.
    pub fn disconnect() -> Self {
        Self::new(PacketKind::Disconnect)
    }

    /// An event without ack.
    pub fn event(method: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: args.into(),
            ..Self::new(PacketKind::Event)
        }
    }

    /// An event expecting an ack reply tagged with `ack_id`.
    pub fn ack_request(ack_id: i64, method: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            ack_id: Some(ack_id),
            ..Self::event(method, args)
        }
        .with_kind(PacketKind::AckRequest)
    }

    /// An ack reply. `args` is written between the outer brackets.
    pub fn ack_response(ack_id: i64, args: impl Into<String>) -> Self {
        Self {
            ack_id: Some(ack_id),
            args: args.into(),
            ..Self::new(PacketKind::AckResponse)
        }
    }

    /// An event followed by `attachments` binary frames.
    pub fn binary_event(
        method: impl Into<String>,
        args: impl Into<String>,
        attachments: usize,
    ) -> Self {
        Self {
            attachments,
            ..Self::event(method, args)
        }
        .with_kind(PacketKind::BinaryEvent)
    }

    fn with_kind(mut self, kind: PacketKind) -> Self {
        self.kind = kind;
        self
    }

    /// The number of binary frames still expected before the message is complete.
    pub fn pending_binary_frames(&self) -> usize {
        self.attachments.saturating_sub(self.received)
    }

    /// Appends one binary frame to the attachment buffer.
    pub fn push_binary(&mut self, frame: &[u8]) {
        self.binary.extend_from_slice(frame);
        self.received += 1;
    }

    /// Whether every announced binary frame was received.
    pub fn is_complete(&self) -> bool {
        self.pending_binary_frames() == 0
    }
}
