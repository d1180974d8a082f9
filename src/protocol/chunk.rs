//! Chunked message framing.
//!
//! A logical message arrives as a sequence of `[u16 BE length][body]`
//! chunks terminated by a zero-length seal chunk. The decoder receives
//! straight into the tail of the message buffer and pops each trailing
//! length with [`IoBuffer::pop_u16`], so after the seal the buffer holds
//! exactly the concatenated chunk bodies.

use crate::error::{MdbError, Result};
use crate::transport::Transport;

use super::{IoBuffer, SEAL};

/// Reassembles one seal-terminated logical message per call.
pub struct ChunkDecoder;

impl ChunkDecoder {
    /// Read chunks from `transport` into `buffer` until the seal.
    ///
    /// Each iteration receives the chunk body together with the next
    /// chunk's length in a single read, then pops the length off the tail.
    /// Transport failures are wrapped as [`MdbError::Framing`]; a
    /// connection that closes mid-message stays [`MdbError::ConnectionClosed`].
    pub fn decode<T: Transport>(transport: &mut T, buffer: &mut IoBuffer) -> Result<()> {
        Self::fill(transport, buffer, 2)?;
        let mut chunk_size = buffer.pop_u16()?;

        while chunk_size != SEAL {
            Self::fill(transport, buffer, chunk_size as usize + 2)?;
            chunk_size = buffer.pop_u16()?;
        }

        Ok(())
    }

    fn fill<T: Transport>(transport: &mut T, buffer: &mut IoBuffer, num_bytes: usize) -> Result<()> {
        let result = transport.recv_into(buffer.tail_mut(num_bytes));
        match result {
            Ok(()) => {
                buffer.commit(num_bytes);
                Ok(())
            }
            Err(MdbError::ConnectionClosed) => Err(MdbError::ConnectionClosed),
            Err(e) => Err(MdbError::Framing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;

    /// Frame `payload` as a single chunk followed by the seal.
    fn one_chunk(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&SEAL.to_be_bytes());
        bytes
    }

    #[test]
    fn test_single_chunk_reassembly() {
        let mut transport = ScriptedTransport::new(one_chunk(b"hello"));
        let mut buffer = IoBuffer::new();

        ChunkDecoder::decode(&mut transport, &mut buffer).unwrap();

        assert_eq!(buffer.used(), 5);
        assert_eq!(buffer.read_bytes(5).unwrap(), b"hello");
    }

    #[test]
    fn test_split_chunks_reassemble_identically() {
        // [2,"he"] [3,"llo"] [seal]
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(b"he");
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(b"llo");
        bytes.extend_from_slice(&SEAL.to_be_bytes());

        let mut transport = ScriptedTransport::new(bytes);
        let mut buffer = IoBuffer::new();
        ChunkDecoder::decode(&mut transport, &mut buffer).unwrap();

        assert_eq!(buffer.as_written(), b"hello");
    }

    #[test]
    fn test_seal_stops_reading() {
        let mut inbound = one_chunk(b"first");
        // Trailing bytes after the seal belong to the next message.
        inbound.extend_from_slice(b"leftover");

        let mut transport = ScriptedTransport::new(inbound);
        let mut buffer = IoBuffer::new();
        ChunkDecoder::decode(&mut transport, &mut buffer).unwrap();

        assert_eq!(buffer.as_written(), b"first");

        // The leftover bytes were not consumed.
        let mut probe = [0u8; 8];
        transport.recv_into(&mut probe).unwrap();
        assert_eq!(&probe, b"leftover");
    }

    #[test]
    fn test_immediate_seal_is_an_empty_message() {
        let mut transport = ScriptedTransport::new(SEAL.to_be_bytes().to_vec());
        let mut buffer = IoBuffer::new();
        ChunkDecoder::decode(&mut transport, &mut buffer).unwrap();
        assert_eq!(buffer.used(), 0);
    }

    #[test]
    fn test_truncated_stream_is_connection_closed() {
        // Length claims 10 bytes, stream ends after 3.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(b"abc");

        let mut transport = ScriptedTransport::new(bytes);
        let mut buffer = IoBuffer::new();
        let err = ChunkDecoder::decode(&mut transport, &mut buffer).unwrap_err();
        assert!(matches!(err, MdbError::ConnectionClosed));
    }

    #[test]
    fn test_buffer_grows_for_large_chunks() {
        let payload = vec![0x5a; 9000];
        let mut transport = ScriptedTransport::new(one_chunk(&payload));
        let mut buffer = IoBuffer::with_capacity(16);
        ChunkDecoder::decode(&mut transport, &mut buffer).unwrap();
        assert_eq!(buffer.as_written(), payload.as_slice());
    }
}
