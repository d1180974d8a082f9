//! Receiving side glue: one decoded value per logical message.

use crate::codec::{MessageDecoder, Value};
use crate::error::Result;
use crate::protocol::{ChunkDecoder, IoBuffer};
use crate::transport::Transport;

/// Owns the per-connection receive buffer and turns the byte stream into
/// decoded values, one seal-terminated message at a time.
///
/// The buffer is reset (not reallocated) between messages, so steady-state
/// receiving does not allocate.
#[derive(Debug, Default)]
pub struct MessageReceiver {
    buffer: IoBuffer,
}

impl MessageReceiver {
    pub fn new() -> Self {
        Self {
            buffer: IoBuffer::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: IoBuffer::with_capacity(capacity),
        }
    }

    /// Receive and decode the next logical message.
    pub fn receive<T: Transport>(&mut self, transport: &mut T) -> Result<Value> {
        self.buffer.reset();
        ChunkDecoder::decode(transport, &mut self.buffer)?;
        MessageDecoder::new(&mut self.buffer).decode()
    }
}
