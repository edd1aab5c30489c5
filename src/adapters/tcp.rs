//! Plain TCP transport adapter.
//!
//! Implements [`Transport`] with a blocking `std::net::TcpStream` and a
//! per-read timeout. ESP-IDF ships a lwIP-backed `std::net`, so the same
//! code runs on the device and on the host.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{Transport, TransportError};

/// Connection to the update server.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host:port` and connect, waiting at most `timeout` for the
    /// handshake. Every later read blocks for at most `timeout` as well.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let peer = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                warn!("TCP: cannot resolve {}:{}: {}", host, port, e);
                TransportError::NotConnected
            })?
            .next()
            .ok_or(TransportError::NotConnected)?;

        let stream = TcpStream::connect_timeout(&peer, timeout).map_err(|e| {
            warn!("TCP: connect to {} failed: {}", peer, e);
            TransportError::NotConnected
        })?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|_| TransportError::Io)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|_| TransportError::Io)?;

        info!("TCP: connected to {}", peer);
        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        loop {
            match stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::TimedOut);
                }
                Err(e) => {
                    warn!("TCP: read error: {}", e);
                    return Err(TransportError::Io);
                }
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(data).map_err(|e| {
            warn!("TCP: write error: {}", e);
            TransportError::Io
        })?;
        stream.flush().map_err(|_| TransportError::Io)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("TCP: shutdown of {} failed: {}", self.peer, e);
            }
            info!("TCP: closed connection to {}", self.peer);
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ───────────────────────────────────────────────────────────────
// Tests (host only)
// ───────────────────────────────────────────────────────────────
