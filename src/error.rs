//! Error types for mdb-client.

use thiserror::Error;

/// Main error type for all driver operations.
#[derive(Debug, Error)]
pub enum MdbError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A typed read ran past the written extent of the buffer.
    /// The message is malformed or truncated; decoding aborts.
    #[error("buffer underrun: requested {requested} bytes, {available} available")]
    BufferUnderrun { requested: usize, available: usize },

    /// The decoder hit a type tag it does not know. Usually a protocol
    /// version mismatch between client and server.
    #[error("unknown data type tag: 0x{0:02x}")]
    UnknownDataType(u8),

    /// A map key was not tagged as a string.
    #[error("map keys must be strings, got tag 0x{0:02x}")]
    InvalidMapKey(u8),

    /// A record's value count does not match the active variable list.
    #[error("record arity mismatch: {variables} variables, {values} values")]
    ArityMismatch { variables: usize, values: usize },

    /// The chunked framing layer could not reassemble a message.
    #[error("framing error: {0}")]
    Framing(String),

    /// The server closed the connection mid-read.
    #[error("connection closed")]
    ConnectionClosed,

    /// The server did not answer the connection preamble correctly.
    #[error("handshake failed")]
    HandshakeFailed,

    /// An error envelope sent by the server for the current request.
    #[error("server error: {0}")]
    Server(String),

    /// Protocol error (malformed envelope, unexpected payload shape, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation attempted on a closed driver.
    #[error("driver is closed")]
    DriverClosed,

    /// Operation attempted on a closed session.
    #[error("session is closed")]
    SessionClosed,
}

/// Result type alias using MdbError.
pub type Result<T> = std::result::Result<T, MdbError>;
