use std::io::Cursor;

use bytes::{Buf, Bytes};
use serde_json::value::RawValue;

use crate::{DecodeError, Message, PacketKind};

/// Decodes one text frame into a [`Message`].
///
/// Binary attachments announced by `45`/`46` packets are not part of the text
/// frame: the returned message reports them through
/// [`Message::pending_binary_frames`] and the caller feeds them with
/// [`Message::push_binary`].
pub fn decode(data: impl Into<Bytes>) -> Result<Message, DecodeError> {
    let source: Bytes = data.into();
    let text = std::str::from_utf8(&source)?;
    let mut reader = Cursor::new(text);
    let kind = read_kind(&mut reader)?;

    let mut msg = Message::new(kind);
    let rest = &text[reader.position() as usize..];
    match kind {
        PacketKind::Open | PacketKind::Close | PacketKind::Connect => msg.args = rest.to_owned(),
        PacketKind::Ping | PacketKind::Pong | PacketKind::Disconnect => (),
        PacketKind::Event | PacketKind::BinaryEvent => {
            if kind == PacketKind::BinaryEvent {
                msg.attachments = read_attachments(&mut reader)?;
            }
            msg.ack_id = read_ack(&mut reader)?;
            if kind == PacketKind::Event && msg.ack_id.is_some() {
                msg.kind = PacketKind::AckRequest;
            }
            let (method, args) = read_event(&text[reader.position() as usize..])?;
            msg.method = method;
            msg.args = args;
        }
        PacketKind::AckResponse | PacketKind::BinaryAck => {
            if kind == PacketKind::BinaryAck {
                msg.attachments = read_attachments(&mut reader)?;
            }
            msg.ack_id = Some(read_ack(&mut reader)?.ok_or(DecodeError::MissingAckId)?);
            msg.args = read_ack_payload(&text[reader.position() as usize..])?.to_owned();
        }
        PacketKind::AckRequest => unreachable!("ack requests are decoded as events"),
    }
    msg.source = source;
    Ok(msg)
}

fn read_kind(reader: &mut Cursor<&str>) -> Result<PacketKind, DecodeError> {
    if !reader.has_remaining() {
        return Err(DecodeError::Empty);
    }
    let kind = match reader.get_u8() {
        b'0' => PacketKind::Open,
        b'1' => PacketKind::Close,
        b'2' => PacketKind::Ping,
        b'3' => PacketKind::Pong,
        b'4' => {
            let sub = reader.has_remaining().then(|| reader.get_u8());
            match sub {
                Some(b'0') => PacketKind::Connect,
                Some(b'1') => PacketKind::Disconnect,
                Some(b'2') => PacketKind::Event,
                Some(b'3') => PacketKind::AckResponse,
                Some(b'5') => PacketKind::BinaryEvent,
                Some(b'6') => PacketKind::BinaryAck,
                c => return Err(DecodeError::InvalidPacketType(c.map(char::from))),
            }
        }
        c => return Err(DecodeError::InvalidPacketType(Some(char::from(c)))),
    };
    Ok(kind)
}

/// Reads the `<n>-` attachment count of binary packets.
fn read_attachments(reader: &mut Cursor<&str>) -> Result<usize, DecodeError> {
    let data = *reader.get_ref();
    let start = reader.position() as usize;
    let len = data[start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if len == 0 || data.as_bytes().get(start + len) != Some(&b'-') {
        return Err(DecodeError::InvalidAttachments);
    }
    let count = data[start..start + len]
        .parse()
        .map_err(|_| DecodeError::InvalidAttachments)?;
    reader.set_position((start + len + 1) as u64);
    Ok(count)
}

/// Reads the optional ack id digits up to the `[` opening the payload.
/// The reader is left on the `[`.
fn read_ack(reader: &mut Cursor<&str>) -> Result<Option<i64>, DecodeError> {
    let data = *reader.get_ref();
    let start = reader.position() as usize;
    let open = data[start..]
        .find('[')
        .ok_or(DecodeError::MissingPayload)?;
    let digits = &data[start..start + open];
    reader.set_position((start + open) as u64);
    if digits.is_empty() {
        return Ok(None);
    }
    if !digits.bytes().all(|c| c.is_ascii_digit()) {
        return Err(DecodeError::InvalidAckId);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| DecodeError::InvalidAckId)
}

/// Splits a `["method", args]` array.
fn read_event(payload: &str) -> Result<(String, String), DecodeError> {
    let (method, args): (String, &RawValue) =
        serde_json::from_str(payload).map_err(DecodeError::InvalidPayload)?;
    Ok((method, args.get().to_owned()))
}

/// Strips the outer brackets of an ack reply payload.
fn read_ack_payload(payload: &str) -> Result<&str, DecodeError> {
    payload
        .trim_end()
        .strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .ok_or(DecodeError::MalformedAckPayload)
}
