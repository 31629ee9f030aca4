use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::{
    channel::Channel,
    handler::{FromMessageParts, MessageParts},
};

/// Deserializes event arguments.
///
/// Some peers send their arguments as a json *string* holding json, e.g.
/// `42["echo","[1,2,3]"]`. If the raw arguments cannot be read as `T` but are a
/// json string, the contents of that string are read as `T` instead.
pub(crate) fn decode_args<T: DeserializeOwned>(args: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str(args) {
        Ok(value) => Ok(value),
        Err(err) => match serde_json::from_str::<String>(args) {
            Ok(inner) => serde_json::from_str(&inner),
            Err(_) => Err(err),
        },
    }
}

/// An Extractor that returns the deserialized event arguments without checking errors.
/// If a deserialization error occurs, the handler won't be called
/// and a debug log will be printed if the `tracing` feature is enabled.
///
/// Arguments sent as stringified json (`"[1,2,3]"`) are decoded from the
/// string contents when they do not match `T` directly.
#[derive(Debug)]
pub struct Data<T>(pub T);

impl<T> FromMessageParts for Data<T>
where
    T: DeserializeOwned,
{
    type Error = serde_json::Error;
    fn from_message_parts(_: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Self::Error> {
        decode_args(&parts.args).map(Data)
    }
}

/// An Extractor that returns the deserialized event arguments or a deserialization error.
#[derive(Debug)]
pub struct TryData<T>(pub Result<T, serde_json::Error>);

impl<T> FromMessageParts for TryData<T>
where
    T: DeserializeOwned,
{
    type Error = Infallible;
    fn from_message_parts(_: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(TryData(decode_args(&parts.args)))
    }
}

/// An Extractor that returns the binary attachments of the event, concatenated.
/// It is empty for events without attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin(pub Bytes);

impl FromMessageParts for Bin {
    type Error = Infallible;
    fn from_message_parts(_: &Arc<Channel>, parts: &mut MessageParts) -> Result<Self, Infallible> {
        Ok(Bin(std::mem::take(&mut parts.binary)))
    }
}

super::__impl_deref!(Data);
super::__impl_deref!(TryData<T>: Result<T, serde_json::Error>);
super::__impl_deref!(Bin: Bytes);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_args() {
        let v: Vec<u32> = decode_args("[1,2,3]").unwrap();
        assert_eq!(v, [1, 2, 3]);
    }

    #[test]
    fn decode_stringified_args() {
        let v: Vec<u32> = decode_args(r#""[1,2,3]""#).unwrap();
        assert_eq!(v, [1, 2, 3]);
        let s: String = decode_args(r#""[1,2,3]""#).unwrap();
        assert_eq!(s, "[1,2,3]");
    }

    #[test]
    fn decode_failure_keeps_first_error() {
        let err = decode_args::<Vec<u32>>("{\"a\":1}").unwrap_err();
        assert!(err.is_data());
        assert!(decode_args::<Vec<u32>>(r#""not json""#).is_err());
    }
}
