//! Outbound request encoding.
//!
//! Every request is a 4-byte BE body length (everything after the length
//! field) followed by a 1-byte request kind and kind-specific tagged
//! fields. Requests fit in a single write; the server delimits its own
//! responses with the chunk framing.

use crate::protocol::{IoBuffer, RequestType};

use super::encode;

/// Builders for the three request kinds.
pub struct RequestBuilder;

impl RequestBuilder {
    /// `Query` request: kind byte plus the String-tagged query text.
    pub fn run(query: &str) -> IoBuffer {
        let query_len = query.len();
        let mut buffer = IoBuffer::with_capacity(10 + query_len);
        buffer.write_u32((6 + query_len) as u32);
        buffer.write_u8(RequestType::Query as u8);
        encode::write_string(&mut buffer, query);
        buffer
    }

    /// `Catalog` request: kind byte only.
    pub fn catalog() -> IoBuffer {
        let mut buffer = IoBuffer::with_capacity(5);
        buffer.write_u32(1);
        buffer.write_u8(RequestType::Catalog as u8);
        buffer
    }

    /// `Cancel` request: kind byte, UInt32-tagged worker index and
    /// String-tagged cancellation token.
    pub fn cancel(worker_index: u32, cancellation_token: &str) -> IoBuffer {
        let token_len = cancellation_token.len();
        let mut buffer = IoBuffer::with_capacity(15 + token_len);
        buffer.write_u32((11 + token_len) as u32);
        buffer.write_u8(RequestType::Cancel as u8);
        encode::write_u32(&mut buffer, worker_index);
        encode::write_string(&mut buffer, cancellation_token);
        buffer
    }
}
