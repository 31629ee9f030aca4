use crate::{EncodeError, Message, PacketKind};

/// Encodes a [`Message`] into its text frame.
///
/// Binary attachments are never part of the text frame, they are sent by the
/// caller as separate frames right after it.
pub fn encode(msg: &Message) -> Result<String, EncodeError> {
    let mut buf = String::with_capacity(size_hint(msg));
    let mut num = itoa::Buffer::new();

    match msg.kind {
        PacketKind::Open => {
            buf.push('0');
            buf.push_str(&msg.args);
        }
        PacketKind::Close => {
            buf.push('1');
            buf.push_str(&msg.args);
        }
        PacketKind::Ping => buf.push('2'),
        PacketKind::Pong => buf.push('3'),
        PacketKind::Connect => {
            buf.push_str("40");
            buf.push_str(&msg.args);
        }
        PacketKind::Disconnect => buf.push_str("41"),
        PacketKind::Event => {
            buf.push_str("42");
            write_event(&mut buf, msg)?;
        }
        PacketKind::AckRequest => {
            let id = msg.ack_id.ok_or(EncodeError::MissingAckId(msg.kind))?;
            buf.push_str("42");
            buf.push_str(num.format(id));
            write_event(&mut buf, msg)?;
        }
        PacketKind::AckResponse => {
            let id = msg.ack_id.ok_or(EncodeError::MissingAckId(msg.kind))?;
            buf.push_str("43");
            buf.push_str(num.format(id));
            write_ack_payload(&mut buf, msg);
        }
        PacketKind::BinaryEvent => {
            buf.push_str("45");
            buf.push_str(num.format(msg.attachments));
            buf.push('-');
            if let Some(id) = msg.ack_id {
                buf.push_str(num.format(id));
            }
            write_event(&mut buf, msg)?;
        }
        PacketKind::BinaryAck => {
            let id = msg.ack_id.ok_or(EncodeError::MissingAckId(msg.kind))?;
            buf.push_str("46");
            buf.push_str(num.format(msg.attachments));
            buf.push('-');
            buf.push_str(num.format(id));
            write_ack_payload(&mut buf, msg);
        }
    }
    Ok(buf)
}

fn args_or_null(msg: &Message) -> &str {
    if msg.args.is_empty() { "null" } else { &msg.args }
}

fn write_event(buf: &mut String, msg: &Message) -> Result<(), EncodeError> {
    buf.push('[');
    buf.push_str(&serde_json::to_string(&msg.method)?);
    buf.push(',');
    buf.push_str(args_or_null(msg));
    buf.push(']');
    Ok(())
}

fn write_ack_payload(buf: &mut String, msg: &Message) {
    buf.push('[');
    buf.push_str(args_or_null(msg));
    buf.push(']');
}

fn size_hint(msg: &Message) -> usize {
    // prefix + ack id + attachment count + brackets, quotes and comma
    const OVERHEAD: usize = 2 + 20 + 20 + 5;
    OVERHEAD + msg.method.len() + msg.args.len()
}
