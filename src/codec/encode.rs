//! Request-side value encoders.
//!
//! The client only ever emits the small set of tags its requests are built
//! from; server-originated types (graph entities, temporal values, paths,
//! containers) are never re-encoded, so the codec is deliberately
//! asymmetric.

use crate::error::{MdbError, Result};
use crate::protocol::{DataType, IoBuffer};

use super::value::Value;

/// Write a `String`-tagged value: tag, 4-byte BE length, UTF-8 bytes.
pub fn write_string(buffer: &mut IoBuffer, text: &str) {
    buffer.write_u8(DataType::String as u8);
    buffer.write_u32(text.len() as u32);
    buffer.write_bytes(text.as_bytes());
}

/// Write a `UInt32`-tagged value.
pub fn write_u32(buffer: &mut IoBuffer, value: u32) {
    buffer.write_u8(DataType::UInt32 as u8);
    buffer.write_u32(value);
}

/// Write a `UInt8`-tagged value.
pub fn write_u8(buffer: &mut IoBuffer, value: u8) {
    buffer.write_u8(DataType::UInt8 as u8);
    buffer.write_u8(value);
}

/// Write a `Bool`-tagged value. Booleans are carried entirely in the tag.
pub fn write_bool(buffer: &mut IoBuffer, value: bool) {
    let tag = if value {
        DataType::BoolTrue
    } else {
        DataType::BoolFalse
    };
    buffer.write_u8(tag as u8);
}

/// Encode a value of a request-side kind.
///
/// Fails with [`MdbError::Protocol`] for kinds the client never emits.
pub fn encode(value: &Value, buffer: &mut IoBuffer) -> Result<()> {
    match value {
        Value::Null => buffer.write_u8(DataType::Null as u8),
        Value::Bool(v) => write_bool(buffer, *v),
        Value::UInt8(v) => write_u8(buffer, *v),
        Value::UInt32(v) => write_u32(buffer, *v),
        Value::String(v) => write_string(buffer, v),
        other => {
            return Err(MdbError::Protocol(format!(
                "value kind is not encodable client-side: {other:?}"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::decode::MessageDecoder;
    use super::*;

    fn round_trip(value: &Value) -> Value {
        let mut buffer = IoBuffer::new();
        encode(value, &mut buffer).unwrap();
        MessageDecoder::new(&mut buffer).decode().unwrap()
    }

    #[test]
    fn test_request_side_round_trips() {
        for value in [
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::UInt8(200),
            Value::UInt32(1 << 30),
            Value::String("MATCH (?x) RETURN *".into()),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn test_string_wire_shape() {
        let mut buffer = IoBuffer::new();
        write_string(&mut buffer, "ab");
        assert_eq!(buffer.as_written(), &[11, 0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_server_only_kinds_are_rejected() {
        let mut buffer = IoBuffer::new();
        assert!(matches!(
            encode(&Value::Int64(-1), &mut buffer),
            Err(MdbError::Protocol(_))
        ));
        assert!(matches!(
            encode(&Value::List(vec![]), &mut buffer),
            Err(MdbError::Protocol(_))
        ));
    }
}
