//! The blocking stream-transport contract every Adapter sits on top of (§6.6).
//!
//! An Adapter owns exactly one `Transport` for its lifetime; transports are never shared across
//! threads. The trait is deliberately small and blocking — Adapters poll it from their own worker
//! thread rather than driving it through an async reactor.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

/// Errors every `Transport` implementation must surface through these two variants; callers match
/// on them to decide whether to reconnect or simply retry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection, or the underlying socket failed outright.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    /// The requested operation did not complete within its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

/// A reliable byte-stream transport, as used by the MQTT and Modbus-TCP adapters.
pub trait Transport: Send {
    /// Establish the underlying connection, failing with `Timeout` if `timeout` elapses first.
    fn connect(&mut self, timeout: Duration) -> Result<(), TransportError>;

    /// Tear down the connection. Idempotent.
    fn disconnect(&mut self);

    /// Whether the transport currently believes it holds a live connection.
    fn is_connected(&self) -> bool;

    /// Bytes immediately readable without blocking (best-effort; 0 is always a valid answer).
    /// May perform a single non-blocking read to find out.
    fn available_bytes(&mut self) -> usize;

    /// Block up to the configured receive timeout for up to `n` bytes; `n == 0` drains whatever
    /// is currently available. Returns fewer than `n` bytes only at EOF.
    fn recv_bytes(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Non-blocking: returns exactly `n` bytes if immediately available, otherwise an empty
    /// vector. Never waits on I/O.
    fn peek_and_recv(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Write `bytes` in full.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Default connect timeout (§5 Timeouts).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2500);
/// Default receive timeout (§5 Timeouts).
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(1000);

/// A plain (non-TLS) blocking TCP transport.
pub struct TcpTransport {
    addr: String,
    recv_timeout: Duration,
    stream: Option<TcpStream>,
    peeked: Vec<u8>,
}

impl TcpTransport {
    /// Construct a transport targeting `host:port`, not yet connected.
    pub fn new(addr: impl Into<String>, recv_timeout: Duration) -> Self {
        TcpTransport {
            addr: addr.into(),
            recv_timeout,
            stream: None,
            peeked: Vec::new(),
        }
    }

    fn resolved_addr(&self) -> Result<SocketAddr, TransportError> {
        self.addr
            .to_socket_addrs()
            .map_err(|e| TransportError::ConnectionFailure(e.to_string()))?
            .next()
            .ok_or_else(|| TransportError::ConnectionFailure(format!("no address for {}", self.addr)))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, timeout: Duration) -> Result<(), TransportError> {
        let addr = self.resolved_addr()?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TransportError::Timeout("connect")
            } else {
                TransportError::ConnectionFailure(e.to_string())
            }
        })?;

        stream
            .set_read_timeout(Some(self.recv_timeout))
            .map_err(|e| TransportError::ConnectionFailure(e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::ConnectionFailure(e.to_string()))?;

        log::info!("connected to {}", self.addr);
        self.stream = Some(stream);
        self.peeked.clear();
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            log::info!("disconnected from {}", self.addr);
        }
        self.peeked.clear();
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn available_bytes(&mut self) -> usize {
        let Some(stream) = self.stream.as_mut() else {
            return self.peeked.len();
        };

        stream.set_read_timeout(Some(Duration::from_millis(0))).ok();
        let mut buf = [0u8; 4096];
        match stream.read(&mut buf) {
            Ok(0) => {}
            Ok(read) => self.peeked.extend_from_slice(&buf[..read]),
            Err(_) => {}
        }
        stream.set_read_timeout(Some(self.recv_timeout)).ok();

        self.peeked.len()
    }

    fn recv_bytes(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::ConnectionFailure("not connected".into()))?;

        if !self.peeked.is_empty() {
            if n == 0 || n >= self.peeked.len() {
                return Ok(std::mem::take(&mut self.peeked));
            }
            return Ok(self.peeked.drain(..n).collect());
        }

        let want = if n == 0 { 4096 } else { n };
        let mut buf = vec![0u8; want];
        let read = match stream.read(&mut buf) {
            Ok(0) => return Err(TransportError::ConnectionFailure("peer closed".into())),
            Ok(read) => read,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(TransportError::Timeout("recv"));
            }
            Err(e) => return Err(TransportError::ConnectionFailure(e.to_string())),
        };
        buf.truncate(read);
        Ok(buf)
    }

    fn peek_and_recv(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::ConnectionFailure("not connected".into()))?;

        while self.peeked.len() < n {
            stream
                .set_read_timeout(Some(Duration::from_millis(0)))
                .ok();
            let mut buf = [0u8; 4096];
            match stream.read(&mut buf) {
                Ok(0) => {
                    return Err(TransportError::ConnectionFailure("peer closed".into()));
                }
                Ok(read) => self.peeked.extend_from_slice(&buf[..read]),
                Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                    stream.set_read_timeout(Some(self.recv_timeout)).ok();
                    return Ok(Vec::new());
                }
                Err(e) => {
                    stream.set_read_timeout(Some(self.recv_timeout)).ok();
                    return Err(TransportError::ConnectionFailure(e.to_string()));
                }
            }
        }
        stream.set_read_timeout(Some(self.recv_timeout)).ok();

        Ok(self.peeked.drain(..n).collect())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::ConnectionFailure("not connected".into()))?;

        stream
            .write_all(bytes)
            .map_err(|e| TransportError::ConnectionFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn connect_send_recv_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let mut transport = TcpTransport::new(addr.to_string(), Duration::from_millis(500));
        transport.connect(Duration::from_millis(500)).unwrap();
        transport.send(b"hello").unwrap();
        let echoed = transport.recv_bytes(5).unwrap();
        assert_eq!(echoed, b"hello");

        server.join().unwrap();
    }

    #[test]
    fn recv_without_connect_is_connection_failure() {
        let mut transport = TcpTransport::new("127.0.0.1:1", Duration::from_millis(10));
        let err = transport.recv_bytes(1).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailure(_)));
    }
}
