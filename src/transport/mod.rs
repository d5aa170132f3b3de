//! Byte transports consumed by the framing core.
//!
//! The transport layer only moves bytes: it knows nothing about frames,
//! heads or correlation. The [`FrameAssembler`](crate::FrameAssembler) and
//! [`TransactionRunner`](crate::TransactionRunner) need three capabilities:
//!
//! - [`Transport::read`] - receive up to N bytes, blocking at most a timeout
//! - [`Transport::write_all`] - send a whole request
//! - [`Transport::available`] - peek how many bytes sit unread (for purging)
//!
//! # Implementations
//!
//! - [`TcpTransport`] - blocking `std::net::TcpStream`
//! - [`ScriptedTransport`] - in-memory byte script for tests and simulations

mod memory;
mod tcp;

pub use memory::ScriptedTransport;
pub use tcp::{TcpTransport, DEFAULT_CONNECT_TIMEOUT};

use std::io;
use std::time::Duration;

/// Largest chunk discarded per read while purging stale bytes.
const PURGE_CHUNK: usize = 1024;

/// Wait used while purging bytes that are already buffered.
const PURGE_WAIT: Duration = Duration::from_millis(1);

/// A duplex byte stream.
///
/// # Read contract
///
/// `read` blocks until at least one byte is available or `timeout` elapses:
///
/// - `Ok(n)` with `n > 0` - `n` bytes were copied into `buf`
/// - `Ok(0)` - the peer closed the stream
/// - `Err` of kind `TimedOut` or `WouldBlock` - nothing arrived in time
pub trait Transport: Send {
    /// Reads up to `buf.len()` bytes, waiting at most `timeout` for the first one.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Writes the whole buffer.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Returns how many bytes can be read without blocking.
    fn available(&mut self) -> io::Result<usize> {
        Ok(0)
    }

    /// Reads and drops every byte that is already buffered.
    ///
    /// Returns the number of bytes discarded.
    fn discard_pending(&mut self) -> io::Result<usize> {
        let mut scratch = [0u8; PURGE_CHUNK];
        let mut discarded = 0;
        loop {
            let pending = self.available()?;
            if pending == 0 {
                return Ok(discarded);
            }
            let chunk = pending.min(PURGE_CHUNK);
            match self.read(&mut scratch[..chunk], PURGE_WAIT) {
                Ok(0) => return Ok(discarded),
                Ok(n) => discarded += n,
                Err(e) if is_timeout(&e) => return Ok(discarded),
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn discard_pending(&mut self) -> io::Result<usize> {
        (**self).discard_pending()
    }
}

/// Returns whether an I/O error means "no data within the timeout".
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
