//! Wire protocol constants and tag tables.
//!
//! Everything the MDB protocol fixes at the byte level lives here: the
//! connection preambles, the self-describing value tag table, and the
//! request/response kind tables. All multi-byte integers on the wire are
//! Big Endian.

mod buffer;
mod chunk;

pub use buffer::{IoBuffer, DEFAULT_INITIAL_CAPACITY};
pub use chunk::ChunkDecoder;

use crate::error::MdbError;

/// Preamble the client sends immediately after connecting.
pub const DRIVER_PREAMBLE: &[u8; 8] = b"MDB_DRVR";

/// Preamble the server must answer with.
pub const SERVER_PREAMBLE: &[u8; 8] = b"MDB_SRVR";

/// Fixed timeout applied to every socket operation.
pub const DEFAULT_SOCKET_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Zero-length chunk marking the end of a logical message.
pub const SEAL: u16 = 0x00_00;

/// Graph model identifiers reported by the catalog.
pub const QUAD_MODEL_ID: u64 = 0;
pub const RDF_MODEL_ID: u64 = 1;

/// Type tag of a self-describing wire value.
///
/// Tag `4` was reserved for a 16-bit unsigned integer but was never assigned
/// a wire encoding; it decodes as [`MdbError::UnknownDataType`] like any
/// other unassigned byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Null = 0,
    BoolFalse = 1,
    BoolTrue = 2,
    UInt8 = 3,
    UInt32 = 5,
    UInt64 = 6,
    Int64 = 7,
    Float = 8,
    Double = 9,
    Decimal = 10,
    String = 11,
    StringLang = 12,
    StringDatatype = 13,
    Iri = 14,
    NamedNode = 15,
    Edge = 16,
    Anon = 17,
    Date = 18,
    Time = 19,
    DateTime = 20,
    Path = 21,
    List = 22,
    Map = 23,
}

impl TryFrom<u8> for DataType {
    type Error = MdbError;

    fn try_from(tag: u8) -> Result<Self, MdbError> {
        Ok(match tag {
            0 => DataType::Null,
            1 => DataType::BoolFalse,
            2 => DataType::BoolTrue,
            3 => DataType::UInt8,
            5 => DataType::UInt32,
            6 => DataType::UInt64,
            7 => DataType::Int64,
            8 => DataType::Float,
            9 => DataType::Double,
            10 => DataType::Decimal,
            11 => DataType::String,
            12 => DataType::StringLang,
            13 => DataType::StringDatatype,
            14 => DataType::Iri,
            15 => DataType::NamedNode,
            16 => DataType::Edge,
            17 => DataType::Anon,
            18 => DataType::Date,
            19 => DataType::Time,
            20 => DataType::DateTime,
            21 => DataType::Path,
            22 => DataType::List,
            23 => DataType::Map,
            other => return Err(MdbError::UnknownDataType(other)),
        })
    }
}

/// Kind byte of an outbound request, written after the 4-byte body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestType {
    Query = 0,
    Catalog = 1,
    Cancel = 2,
}

/// Kind of a decoded response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseType {
    Success = 0,
    Error = 1,
    Record = 2,
    Variables = 3,
}

impl TryFrom<u8> for ResponseType {
    type Error = MdbError;

    fn try_from(kind: u8) -> Result<Self, MdbError> {
        Ok(match kind {
            0 => ResponseType::Success,
            1 => ResponseType::Error,
            2 => ResponseType::Record,
            3 => ResponseType::Variables,
            other => {
                return Err(MdbError::Protocol(format!(
                    "unknown response type: 0x{other:02x}"
                )))
            }
        })
    }
}
