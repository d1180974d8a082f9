//! Blocking TCP transport with the MDB connection handshake.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{MdbError, Result};
use crate::protocol::{DRIVER_PREAMBLE, SERVER_PREAMBLE};

use super::Transport;

/// Connected TCP stream that has completed the preamble exchange.
///
/// Every socket operation carries a fixed timeout; a timeout or any other
/// I/O error is fatal to the session owning this transport.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`, apply the socket timeout and perform the
    /// handshake: send `MDB_DRVR`, expect exactly `MDB_SRVR` back.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let mut transport = Self { stream };
        if let Err(e) = transport.handshake() {
            transport.close();
            return Err(e);
        }
        tracing::debug!(host, port, "connected");
        Ok(transport)
    }

    /// Connect to an already resolved address. Used by tests that bind an
    /// ephemeral loopback listener.
    pub fn connect_addr<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let mut transport = Self { stream };
        if let Err(e) = transport.handshake() {
            transport.close();
            return Err(e);
        }
        Ok(transport)
    }

    /// Duplicate the underlying socket handle so another owner can shut the
    /// connection down (driver bulk close).
    pub(crate) fn try_clone_stream(&self) -> std::io::Result<TcpStream> {
        self.stream.try_clone()
    }

    fn handshake(&mut self) -> Result<()> {
        self.send_all(DRIVER_PREAMBLE)?;
        let mut reply = [0u8; 8];
        self.recv_into(&mut reply)
            .map_err(|_| MdbError::HandshakeFailed)?;
        if &reply != SERVER_PREAMBLE {
            return Err(MdbError::HandshakeFailed);
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(MdbError::ConnectionClosed);
            }
            filled += n;
        }
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
