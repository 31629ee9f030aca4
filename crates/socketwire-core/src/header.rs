use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DecodeError, Message, PacketKind};

/// The handshake payload of an Engine.IO open packet (`0{...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHeader {
    /// The session id assigned by the server.
    pub sid: String,
    /// The transports the session may be upgraded to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Heartbeat interval in milliseconds.
    pub ping_interval: u64,
    /// Heartbeat timeout in milliseconds.
    pub ping_timeout: u64,
    /// Maximum payload size accepted by the server, sent by v4 servers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHeader {
    /// Creates a header for a server session without upgrades.
    pub fn new(sid: impl Into<String>, ping_interval: Duration, ping_timeout: Duration) -> Self {
        Self {
            sid: sid.into(),
            upgrades: Vec::new(),
            ping_interval: ping_interval.as_millis() as u64,
            ping_timeout: ping_timeout.as_millis() as u64,
            max_payload: None,
        }
    }

    /// Reads the header from a decoded open packet.
    pub fn from_message(msg: &Message) -> Result<Self, DecodeError> {
        if msg.kind != PacketKind::Open {
            return Err(DecodeError::NotOpen(msg.kind));
        }
        serde_json::from_str(&msg.args).map_err(DecodeError::InvalidHeader)
    }

    /// Builds the open packet carrying this header.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let mut msg = Message::new(PacketKind::Open);
        msg.args = serde_json::to_string(self)?;
        Ok(msg)
    }

    /// The heartbeat interval and timeout.
    pub fn heartbeat(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.ping_interval),
            Duration::from_millis(self.ping_timeout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, encode};

    #[test]
    fn parse_open_packet() {
        let msg = decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let header = OpenHeader::from_message(&msg).unwrap();
        assert_eq!(header.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(header.upgrades, ["websocket"]);
        assert_eq!(
            header.heartbeat(),
            (Duration::from_secs(25), Duration::from_secs(20))
        );
        assert_eq!(header.max_payload, Some(1_000_000));
    }

    #[test]
    fn v3_header_without_max_payload() {
        let msg = decode(r#"0{"sid":"abc","pingInterval":30000,"pingTimeout":60000}"#).unwrap();
        let header = OpenHeader::from_message(&msg).unwrap();
        assert!(header.upgrades.is_empty());
        assert_eq!(header.max_payload, None);
    }

    #[test]
    fn invalid_header() {
        let msg = decode("0{\"sid\":1}").unwrap();
        assert!(matches!(
            OpenHeader::from_message(&msg),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn open_packet_text() {
        let header = OpenHeader::new("abc", Duration::from_secs(30), Duration::from_secs(60));
        let text = encode(&header.to_message().unwrap()).unwrap();
        assert_eq!(
            text,
            r#"0{"sid":"abc","upgrades":[],"pingInterval":30000,"pingTimeout":60000}"#
        );
    }
}
