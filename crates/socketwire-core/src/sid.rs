use std::{fmt, str::FromStr};

use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize, de::Error as _};

/// A random 16 character url-safe session identifier.
///
/// Servers hand it to peers in the open header, and the engine uses it as the
/// key of a session in the backpressure tracker.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sid([u8; Sid::LEN]);

impl Sid {
    const LEN: usize = 16;

    /// Generates a fresh random id.
    pub fn new() -> Self {
        // 12 random bytes encode to exactly 16 base64 chars without padding.
        let mut seed = [0u8; 12];
        rand::rng().fill(&mut seed);
        let mut id = [0u8; Self::LEN];
        let written = base64::prelude::BASE64_URL_SAFE_NO_PAD
            .encode_slice(seed, &mut id)
            .unwrap_or_default();
        debug_assert_eq!(written, Self::LEN);
        Sid(id)
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        // Only url-safe ascii is ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for Sid {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned when parsing a [`Sid`] from a string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SidParseError {
    /// The string is not 16 characters long.
    #[error("session id must be 16 characters, got {0}")]
    Length(usize),
    /// The string contains a character outside of the url-safe base64 alphabet.
    #[error("invalid session id character {0:?}")]
    Character(char),
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN {
            return Err(SidParseError::Length(s.len()));
        }
        let mut id = [0u8; Self::LEN];
        for (slot, byte) in id.iter_mut().zip(s.bytes()) {
            if !(byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_') {
                return Err(SidParseError::Character(byte as char));
            }
            *slot = byte;
        }
        Ok(Sid(id))
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({})", self.as_str())
    }
}

impl Serialize for Sid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
