//! Driver: connection factory and bulk shutdown.
//!
//! A [`Driver`] holds the server address and per-connection settings and
//! opens one TCP connection per [`Session`]. It keeps a duplicated socket
//! handle for every session it opened so [`Driver::close`] can shut all of
//! them down at once, unblocking sessions parked in a read.
//!
//! Sessions opened by a driver get a canceller wired back to it: a query
//! timeout makes the watcher thread open a fresh connection through the
//! driver and send the cancel request there, never touching the session's
//! own socket.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::error::{MdbError, Result};
use crate::protocol::{DEFAULT_INITIAL_CAPACITY, DEFAULT_SOCKET_TIMEOUT};
use crate::response::QueryPreamble;
use crate::result::Canceller;
use crate::session::Session;
use crate::transport::TcpTransport;

/// Per-connection settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Timeout applied to every socket read and write.
    pub socket_timeout: Duration,
    /// Initial capacity of each session's receive buffer.
    pub initial_buffer_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            initial_buffer_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

/// Entry point: parses the server URL and opens sessions.
///
/// Cloning is cheap; clones share the open flag and the session registry.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    host: String,
    port: u16,
    config: DriverConfig,
    open: AtomicBool,
    /// Duplicated socket handles of every session this driver opened,
    /// kept for bulk shutdown.
    sockets: Mutex<Vec<TcpStream>>,
}

impl Driver {
    /// Create a driver for `url` with default settings.
    ///
    /// The URL is `host:port`, optionally prefixed with a scheme such as
    /// `mdb://`. No connection is opened until [`Driver::session`].
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, DriverConfig::default())
    }

    pub fn with_config(url: &str, config: DriverConfig) -> Result<Self> {
        let (host, port) = parse_url(url)?;
        Ok(Self {
            inner: Arc::new(DriverInner {
                host,
                port,
                config,
                open: AtomicBool::new(true),
                sockets: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Open a new session on its own connection.
    pub fn session(&self) -> Result<Session> {
        self.inner.ensure_open()?;
        self.inner.open_session()
    }

    /// Fetch the server catalog on a short-lived session.
    pub fn catalog(&self) -> Result<Catalog> {
        let mut session = self.session()?;
        session.catalog()
    }

    /// Send a best-effort cancel request for `preamble` on a fresh
    /// connection. Returns once the request is written; no acknowledgement
    /// is awaited.
    pub fn cancel(&self, preamble: &QueryPreamble) -> Result<()> {
        self.inner.ensure_open()?;
        self.inner.cancel(preamble)
    }

    /// Close the driver: refuse new sessions and shut down every
    /// connection it opened. Sessions blocked in a read observe a
    /// connection error. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }
}

impl DriverInner {
    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(MdbError::DriverClosed)
        }
    }

    fn open_session(self: &Arc<Self>) -> Result<Session> {
        let transport = TcpTransport::connect(&self.host, self.port, self.config.socket_timeout)?;
        match transport.try_clone_stream() {
            Ok(handle) => self.sockets.lock().push(handle),
            // The session still works, it just escapes bulk shutdown.
            Err(e) => tracing::warn!("could not register session socket: {e}"),
        }

        let inner = self.clone();
        let canceller: Canceller = Arc::new(move |preamble: &QueryPreamble| {
            if let Err(e) = inner.cancel(preamble) {
                tracing::warn!(
                    worker_index = preamble.worker_index,
                    "cancel request failed: {e}"
                );
            }
        });

        Ok(Session::new(
            transport,
            Some(canceller),
            self.config.initial_buffer_capacity,
        ))
    }

    fn cancel(self: &Arc<Self>, preamble: &QueryPreamble) -> Result<()> {
        self.ensure_open()?;
        let mut session = self.open_session()?;
        session.send_cancel(preamble)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let sockets = std::mem::take(&mut *self.sockets.lock());
            tracing::debug!(sessions = sockets.len(), "driver closing");
            for socket in sockets {
                let _ = socket.shutdown(std::net::Shutdown::Both);
            }
        }
    }
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_url(url: &str) -> Result<(String, u16)> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| MdbError::Protocol(format!("connection URL must be host:port: {url:?}")))?;
    if host.is_empty() {
        return Err(MdbError::Protocol(format!(
            "connection URL has an empty host: {url:?}"
        )));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| MdbError::Protocol(format!("invalid port in connection URL: {url:?}")))?;
    Ok((host.to_string(), port))
}
