//! Engine and protocol configuration.
use std::{str::FromStr, time::Duration};

/// The engine.io protocol revision spoken on the wire.
///
/// It changes how binary frames are written, see [`ProtocolVersion::V3`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// Engine.IO v3: every binary websocket frame is prefixed with the `0x04` byte.
    V3 = 3,
    /// Engine.IO v4: binary frames are sent as is.
    #[default]
    V4 = 4,
}

impl ProtocolVersion {
    /// The value of the `EIO` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::V3 => "3",
            ProtocolVersion::V4 => "4",
        }
    }
}

/// Error returned when parsing an unknown `EIO` value.
#[derive(Debug, thiserror::Error)]
#[error("unknown protocol version {0:?}")]
pub struct UnknownProtocolVersionError(String);

impl FromStr for ProtocolVersion {
    type Err = UnknownProtocolVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3" => Ok(ProtocolVersion::V3),
            "4" => Ok(ProtocolVersion::V4),
            _ => Err(UnknownProtocolVersionError(s.to_owned())),
        }
    }
}

/// Configuration shared by every channel of an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The outbound queue capacity of a channel, in messages.
    ///
    /// A channel is reported to the backpressure tracker once its queue is more
    /// than half full, and is closed once it reaches `max_buffer_size - 1`.
    ///
    /// Defaults to 500 messages, values lower than 5 are raised to 5.
    pub max_buffer_size: usize,

    /// The timeout used by [`Channel::emit_with_ack`](crate::Channel::emit_with_ack).
    ///
    /// Defaults to 5 seconds.
    pub ack_timeout: Duration,

    /// The number of received events that may wait for their handler.
    /// When full the channel stops reading from its transport.
    ///
    /// Defaults to 128 events.
    pub dispatch_buffer: usize,

    /// The engine.io protocol revision.
    ///
    /// Defaults to [`ProtocolVersion::V4`].
    pub protocol: ProtocolVersion,
}

impl EngineConfig {
    pub(crate) const MIN_BUFFER_SIZE: usize = 5;

    /// Creates a new [`EngineBuilder`](crate::EngineBuilder).
    pub fn builder() -> crate::EngineBuilder {
        crate::EngineBuilder::new()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 500,
            ack_timeout: Duration::from_secs(5),
            dispatch_buffer: 128,
            protocol: ProtocolVersion::V4,
        }
    }
}
