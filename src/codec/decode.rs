//! Self-describing message decoder.
//!
//! Reads one [`Value`] from an [`IoBuffer`], dispatching on the leading
//! type tag and recursing for containers and paths. Temporal sub-fields
//! arrive as nested `Int64`-tagged values and a path segment's direction
//! flag as a nested `Bool`-tagged value; the nesting is part of the wire
//! contract and is decoded as such, never as raw integers.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::error::{MdbError, Result};
use crate::protocol::{DataType, IoBuffer};

use super::value::{Date, DateTime, Path, PathSegment, Time, Value};

/// Decoder over a received message buffer.
pub struct MessageDecoder<'a> {
    buffer: &'a mut IoBuffer,
}

impl<'a> MessageDecoder<'a> {
    /// Wrap a buffer positioned at the start of a value.
    pub fn new(buffer: &'a mut IoBuffer) -> Self {
        Self { buffer }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<Value> {
        let tag = self.buffer.read_u8()?;
        match DataType::try_from(tag)? {
            DataType::Null => Ok(Value::Null),
            DataType::BoolFalse => Ok(Value::Bool(false)),
            DataType::BoolTrue => Ok(Value::Bool(true)),
            DataType::UInt8 => Ok(Value::UInt8(self.buffer.read_u8()?)),
            DataType::UInt32 => Ok(Value::UInt32(self.buffer.read_u32()?)),
            DataType::UInt64 => Ok(Value::UInt64(self.buffer.read_u64()?)),
            DataType::Int64 => Ok(Value::Int64(self.buffer.read_i64()?)),
            DataType::Float => Ok(Value::Float32(self.buffer.read_f32()?)),
            DataType::Double => Ok(Value::Float64(self.buffer.read_f64()?)),
            DataType::Decimal => self.decode_decimal(),
            DataType::String => Ok(Value::String(self.decode_string()?)),
            DataType::StringLang => Ok(Value::StringLang {
                text: self.decode_string()?,
                lang: self.decode_string()?,
            }),
            DataType::StringDatatype => Ok(Value::StringDatatype {
                text: self.decode_string()?,
                datatype: self.decode_string()?,
            }),
            DataType::Iri => Ok(Value::Iri(self.decode_string()?)),
            DataType::NamedNode => Ok(Value::Node(self.decode_string()?)),
            DataType::Edge => Ok(Value::Edge(self.decode_string()?)),
            DataType::Anon => Ok(Value::Anon(self.decode_string()?)),
            DataType::Date => {
                let year = self.decode_i64_field()?;
                let month = self.decode_i64_field()?;
                let day = self.decode_i64_field()?;
                let tz_offset_minutes = self.decode_i64_field()?;
                Ok(Value::Date(Date {
                    year,
                    month,
                    day,
                    tz_offset_minutes,
                }))
            }
            DataType::Time => {
                let hour = self.decode_i64_field()?;
                let minute = self.decode_i64_field()?;
                let second = self.decode_i64_field()?;
                let tz_offset_minutes = self.decode_i64_field()?;
                Ok(Value::Time(Time {
                    hour,
                    minute,
                    second,
                    tz_offset_minutes,
                }))
            }
            DataType::DateTime => {
                let year = self.decode_i64_field()?;
                let month = self.decode_i64_field()?;
                let day = self.decode_i64_field()?;
                let hour = self.decode_i64_field()?;
                let minute = self.decode_i64_field()?;
                let second = self.decode_i64_field()?;
                let tz_offset_minutes = self.decode_i64_field()?;
                Ok(Value::DateTime(DateTime {
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                    tz_offset_minutes,
                }))
            }
            DataType::Path => self.decode_path(),
            DataType::List => self.decode_list(),
            DataType::Map => self.decode_map(),
        }
    }

    /// Length-prefixed UTF-8 string (4-byte BE count).
    fn decode_string(&mut self) -> Result<String> {
        let len = self.buffer.read_u32()? as usize;
        self.buffer.read_string(len)
    }

    /// Decimal: length-prefixed canonical string, parsed with full
    /// precision.
    fn decode_decimal(&mut self) -> Result<Value> {
        let text = self.decode_string()?;
        let decimal = BigDecimal::from_str(&text)
            .map_err(|_| MdbError::Protocol(format!("invalid decimal literal: {text:?}")))?;
        Ok(Value::Decimal(decimal))
    }

    /// Temporal sub-field: a nested value that must carry the `Int64` tag.
    fn decode_i64_field(&mut self) -> Result<i64> {
        match self.decode()? {
            Value::Int64(v) => Ok(v),
            other => Err(MdbError::Protocol(format!(
                "temporal field must be an Int64-tagged value, got {other:?}"
            ))),
        }
    }

    fn decode_list(&mut self) -> Result<Value> {
        let len = self.buffer.read_u32()? as usize;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::List(items))
    }

    fn decode_map(&mut self) -> Result<Value> {
        let len = self.buffer.read_u32()? as usize;
        let mut entries = HashMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key_tag = self.buffer.read_u8()?;
            if key_tag != DataType::String as u8 {
                return Err(MdbError::InvalidMapKey(key_tag));
            }
            let key = self.decode_string()?;
            let value = self.decode()?;
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }

    /// Path: 4-byte segment count, then either a single node (zero-length
    /// path, reused as both endpoints) or the first node followed by
    /// `(reverse, type, to)` triples chained through shared endpoints.
    fn decode_path(&mut self) -> Result<Value> {
        let len = self.buffer.read_u32()? as usize;
        if len == 0 {
            let node = self.decode()?;
            return Ok(Value::Path(Box::new(Path {
                start: node.clone(),
                end: node,
                segments: Vec::new(),
            })));
        }

        let mut segments = Vec::with_capacity(len.min(1024));
        let mut from = self.decode()?;
        let start = from.clone();
        for _ in 0..len {
            let reverse = match self.decode()? {
                Value::Bool(b) => b,
                other => {
                    return Err(MdbError::Protocol(format!(
                        "path direction must be a Bool-tagged value, got {other:?}"
                    )))
                }
            };
            let segment_type = self.decode()?;
            let to = self.decode()?;
            segments.push(PathSegment {
                from,
                to: to.clone(),
                segment_type,
                reverse,
            });
            from = to;
        }

        Ok(Value::Path(Box::new(Path {
            start,
            end: from,
            segments,
        })))
    }
}
