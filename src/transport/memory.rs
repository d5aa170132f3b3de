//! In-memory scripted transport.
//!
//! [`ScriptedTransport`] plays back a queue of byte chunks, closes and
//! failures, and records every request written to it. Replies can be queued
//! so they only become readable after the next write, the way a device only
//! answers once it has been asked.
//!
//! # Example
//!
//! ```
//! use plc_link::{ScriptedTransport, Transport};
//! use std::time::Duration;
//!
//! let transport = ScriptedTransport::new();
//! transport.queue_reply([0x03, 0x00, 0x00, 0x04]);
//!
//! let mut io = transport.clone();
//! io.write_all(&[0x03, 0x00, 0x00, 0x05, 0xFF]).unwrap();
//!
//! let mut buf = [0u8; 4];
//! assert_eq!(io.read(&mut buf, Duration::from_millis(10)).unwrap(), 4);
//! assert_eq!(transport.writes(), vec![vec![0x03, 0x00, 0x00, 0x05, 0xFF]]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::Transport;

/// One scripted event on the inbound side.
#[derive(Debug, Clone)]
enum Step {
    Data(Vec<u8>),
    Close,
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct Script {
    inbound: VecDeque<Step>,
    replies: VecDeque<Vec<Step>>,
    writes: Vec<Vec<u8>>,
    reads: usize,
}

/// Transport backed by an in-memory script.
///
/// Clones share the same script, so a test can keep a handle while the
/// runner owns another. An empty script behaves like a silent line: reads
/// wait for the whole timeout and then report `TimedOut`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bytes` readable immediately.
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.script.lock().inbound.push_back(Step::Data(bytes));
        }
    }

    /// Makes the peer close the stream once earlier steps are consumed.
    pub fn push_close(&self) {
        self.script.lock().inbound.push_back(Step::Close);
    }

    /// Makes the next read past earlier steps fail with `kind`.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.script.lock().inbound.push_back(Step::Fail(kind));
    }

    /// Queues `bytes` to become readable after the next write.
    pub fn queue_reply(&self, bytes: impl Into<Vec<u8>>) {
        self.queue_reply_chunks(vec![bytes.into()]);
    }

    /// Queues a reply delivered as separate chunks after the next write.
    pub fn queue_reply_chunks(&self, chunks: Vec<Vec<u8>>) {
        let steps = chunks
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(Step::Data)
            .collect();
        self.script.lock().replies.push_back(steps);
    }

    /// Queues a write that gets no reply.
    pub fn queue_silence(&self) {
        self.script.lock().replies.push_back(Vec::new());
    }

    /// Returns every request written so far.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script.lock().writes.clone()
    }

    /// Returns the number of inbound bytes not yet read.
    pub fn pending(&self) -> usize {
        pending_bytes(&self.script.lock().inbound)
    }

    /// Returns how many reads returned data, closed or failed.
    pub fn read_count(&self) -> usize {
        self.script.lock().reads
    }
}

fn pending_bytes(inbound: &VecDeque<Step>) -> usize {
    inbound
        .iter()
        .map(|step| match step {
            Step::Data(bytes) => bytes.len(),
            _ => 0,
        })
        .sum()
}

impl Transport for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        {
            let mut script = self.script.lock();
            match script.inbound.pop_front() {
                Some(Step::Data(mut bytes)) => {
                    script.reads += 1;
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        script.inbound.push_front(Step::Data(bytes.split_off(n)));
                    }
                    return Ok(n);
                }
                Some(Step::Close) => {
                    script.reads += 1;
                    // A closed stream stays closed.
                    script.inbound.push_front(Step::Close);
                    return Ok(0);
                }
                Some(Step::Fail(kind)) => {
                    script.reads += 1;
                    return Err(io::Error::from(kind));
                }
                None => {}
            }
        }
        thread::sleep(timeout);
        Err(io::Error::from(io::ErrorKind::TimedOut))
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut script = self.script.lock();
        script.writes.push(data.to_vec());
        if let Some(reply) = script.replies.pop_front() {
            script.inbound.extend(reply);
        }
        Ok(())
    }

    fn available(&mut self) -> io::Result<usize> {
        Ok(pending_bytes(&self.script.lock().inbound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(5);

    #[test]
    fn test_partial_chunk_consumption() {
        let mut transport = ScriptedTransport::new();
        transport.push_bytes([1, 2, 3, 4, 5]);

        let mut buf = [0u8; 2];
        assert_eq!(transport.read(&mut buf, WAIT).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(transport.pending(), 3);
        assert_eq!(transport.read_count(), 1);
    }

    #[test]
    fn test_empty_script_times_out() {
        let mut transport = ScriptedTransport::new();
        let mut buf = [0u8; 2];
        let err = transport.read(&mut buf, WAIT).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(transport.read_count(), 0);
    }

    #[test]
    fn test_close_is_sticky() {
        let mut transport = ScriptedTransport::new();
        transport.push_close();
        let mut buf = [0u8; 2];
        assert_eq!(transport.read(&mut buf, WAIT).unwrap(), 0);
        assert_eq!(transport.read(&mut buf, WAIT).unwrap(), 0);
    }

    #[test]
    fn test_reply_released_by_write() {
        let mut transport = ScriptedTransport::new();
        transport.queue_reply_chunks(vec![vec![1], vec![2, 3]]);
        assert_eq!(transport.available().unwrap(), 0);

        transport.write_all(&[0xFF]).unwrap();
        assert_eq!(transport.available().unwrap(), 3);
        assert_eq!(transport.writes(), vec![vec![0xFF]]);
    }

    #[test]
    fn test_silence_consumes_a_write() {
        let mut transport = ScriptedTransport::new();
        transport.queue_silence();
        transport.queue_reply([9]);

        transport.write_all(&[1]).unwrap();
        assert_eq!(transport.pending(), 0);
        transport.write_all(&[2]).unwrap();
        assert_eq!(transport.pending(), 1);
    }

    #[test]
    fn test_scripted_error() {
        let mut transport = ScriptedTransport::new();
        transport.push_error(io::ErrorKind::ConnectionReset);
        let mut buf = [0u8; 1];
        let err = transport.read(&mut buf, WAIT).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
