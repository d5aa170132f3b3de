//! TCP transport for stream-framed device protocols.
//!
//! [`TcpTransport`] handles low-level TCP communication with a device. It is
//! completely separated from the framing layer: it only knows about sockets
//! and bytes.
//!
//! # Design
//!
//! - **Protocol agnostic** - Handles only byte transmission, no framing knowledge
//! - **Synchronous** - Blocking send/receive; reads take a per-call timeout,
//!   writes give up after the timeout set at connect
//! - **Simple** - One stream, one remote address, no reconnection
//!
//! # Example
//!
//! ```no_run
//! use plc_link::{TcpTransport, Transport};
//! use std::time::Duration;
//!
//! let mut transport = TcpTransport::connect(
//!     "192.168.1.10:502".parse().unwrap(),
//!     Duration::from_secs(2),
//! ).unwrap();
//!
//! transport.write_all(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01]).unwrap();
//! let mut buf = [0u8; 64];
//! let n = transport.read(&mut buf, Duration::from_secs(2)).unwrap();
//! ```

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use super::Transport;
use crate::error::{LinkError, Result};

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Smallest timeout the socket accepts; zero means "block forever".
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// Peek buffer used to count buffered bytes.
const PEEK_BUFFER: usize = 4096;

/// TCP transport over a blocking `std::net::TcpStream`.
pub struct TcpTransport {
    stream: TcpStream,
    remote_addr: SocketAddr,
}

impl TcpTransport {
    /// Connects to a device.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address of the device (IP:port)
    /// * `timeout` - Upper bound on connection establishment and on each
    ///   blocked write
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Timeout` if the connection is not established in
    /// time, or `LinkError::Transport` for other socket errors.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| LinkError::from_io(e, 0))?;
        debug!(%addr, "tcp transport connected");
        Self::from_stream(stream, timeout)
    }

    /// Wraps an already connected stream.
    ///
    /// A write that makes no progress for `write_timeout` fails with
    /// `TimedOut` or `WouldBlock`, which the runner reports as
    /// `LinkError::Timeout`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stream cannot be configured.
    pub fn from_stream(stream: TcpStream, write_timeout: Duration) -> Result<Self> {
        // Requests are small and latency bound.
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(write_timeout.max(MIN_SOCKET_TIMEOUT)))?;
        let remote_addr = stream.peer_addr()?;
        Ok(Self {
            stream,
            remote_addr,
        })
    }

    /// Returns the remote device address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Changes how long a blocked write waits before failing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket rejects the option.
    pub fn set_write_timeout(&self, timeout: Duration) -> Result<()> {
        self.stream
            .set_write_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        Ok(())
    }

    /// Returns a reference to the underlying stream.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.stream
            .set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        self.stream.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn available(&mut self) -> io::Result<usize> {
        let mut probe = [0u8; PEEK_BUFFER];
        self.stream.set_nonblocking(true)?;
        let peeked = self.stream.peek(&mut probe);
        self.stream.set_nonblocking(false)?;
        match peeked {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunnerConfig, TransactionRunner};
    use crate::spec::ModbusTcp;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    /// Large enough to fill both socket buffers of a loopback pair.
    const STALLED_WRITE: usize = 64 * 1024 * 1024;

    fn loopback_pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpTransport::connect(addr, Duration::from_secs(1)));
        let (server, _) = listener.accept().unwrap();
        (client.join().unwrap().unwrap(), server)
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs(2));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let (mut transport, mut server) = loopback_pair();

        transport.write_all(&[0x03, 0x00, 0x00, 0x07]).unwrap();
        let mut request = [0u8; 4];
        server.read_exact(&mut request).unwrap();
        assert_eq!(request, [0x03, 0x00, 0x00, 0x07]);

        server.write_all(&[0xAA, 0xBB]).unwrap();
        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf, Duration::from_secs(1)).unwrap();
        assert!(n >= 1);
        assert_eq!(buf[0], 0xAA);
    }

    #[test]
    fn test_read_times_out() {
        let (mut transport, _server) = loopback_pair();
        let mut buf = [0u8; 8];
        let err = transport
            .read(&mut buf, Duration::from_millis(20))
            .unwrap_err();
        assert!(super::super::is_timeout(&err));
    }

    #[test]
    fn test_read_reports_close() {
        let (mut transport, server) = loopback_pair();
        drop(server);
        let mut buf = [0u8; 8];
        assert_eq!(transport.read(&mut buf, Duration::from_secs(1)).unwrap(), 0);
    }

    #[test]
    fn test_available_and_discard() {
        let (mut transport, mut server) = loopback_pair();
        assert_eq!(transport.available().unwrap(), 0);

        server.write_all(&[1, 2, 3, 4, 5]).unwrap();
        server.flush().unwrap();
        // Loopback delivery is asynchronous.
        let mut waited = 0;
        while transport.available().unwrap() < 5 && waited < 100 {
            thread::sleep(Duration::from_millis(5));
            waited += 1;
        }
        assert_eq!(transport.available().unwrap(), 5);
        assert_eq!(transport.discard_pending().unwrap(), 5);
        assert_eq!(transport.available().unwrap(), 0);
    }

    #[test]
    fn test_write_times_out_when_peer_stops_reading() {
        let (mut transport, _server) = loopback_pair();
        transport.set_write_timeout(Duration::from_millis(100)).unwrap();

        let started = Instant::now();
        let err = transport.write_all(&vec![0u8; STALLED_WRITE]).unwrap_err();
        assert!(super::super::is_timeout(&err), "unexpected error: {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stalled_write_releases_runner_lock() {
        let (transport, _server) = loopback_pair();
        transport.set_write_timeout(Duration::from_millis(200)).unwrap();
        let config = RunnerConfig::new()
            .with_receive_timeout(Duration::from_millis(200))
            .with_lock_timeout(Duration::from_millis(200));
        let runner = TransactionRunner::new(transport, config);

        let started = Instant::now();
        let err = runner
            .send_and_receive(&vec![0u8; STALLED_WRITE], &ModbusTcp)
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout), "unexpected error: {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));

        // The lock is free again: the next call fails on the silent line, not on the lock.
        let err = runner.receive(&ModbusTcp).unwrap_err();
        assert!(matches!(err, LinkError::Timeout), "unexpected error: {err:?}");
    }

    #[test]
    fn test_transport_debug() {
        let (transport, _server) = loopback_pair();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("TcpTransport"));
        assert!(debug_str.contains("127.0.0.1"));
    }
}
