//! Transport boundary: reliable byte delivery over a connected stream.
//!
//! The protocol core consumes a connection only through the [`Transport`]
//! trait: send everything or fail, fill a slice exactly or fail. Connection
//! establishment (including the 8-byte preamble handshake) belongs to the
//! concrete implementation, see [`TcpTransport`].

mod tcp;

pub use tcp::TcpTransport;

use crate::error::Result;

/// Minimal send/receive contract the protocol core is written against.
pub trait Transport {
    /// Send the whole byte slice.
    fn send_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Fill `buf` completely. A connection that closes before the slice is
    /// full yields [`crate::MdbError::ConnectionClosed`].
    fn recv_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Tear down the connection. Idempotent, never fails.
    fn close(&mut self);
}
