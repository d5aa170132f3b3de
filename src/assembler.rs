//! Frame assembly from a byte stream.
//!
//! [`FrameAssembler`] cuts exactly one frame out of a [`Transport`] using the
//! rules of a [`FrameSpec`]:
//!
//! 1. Read exactly `header_length()` bytes
//! 2. Drop leading junk bytes once if the head is reported misaligned
//! 3. Validate the head (signature, session token)
//! 4. Compute the body length, reading more head bytes while `body_length`
//!    answers [`LinkError::Incomplete`]
//! 5. Return immediately for a zero-length body, otherwise read the body
//!
//! All reads of one frame share a single deadline, so a peer trickling bytes
//! cannot stretch a frame past the timeout.
//!
//! # Example
//!
//! ```
//! use plc_link::spec::FujiSpb;
//! use plc_link::{FrameAssembler, ScriptedTransport};
//! use std::time::Duration;
//!
//! let mut source = ScriptedTransport::new();
//! source.push_bytes(*b":0103");
//! source.push_bytes(*b"ABCDEFGH");
//!
//! let frame = FrameAssembler::new(&FujiSpb)
//!     .read_frame(&mut source, None, None, Duration::from_millis(100))
//!     .unwrap();
//! assert_eq!(frame.len(), 13);
//! ```

use std::io;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{LinkError, Result};
use crate::frame::Frame;
use crate::runner::CancelToken;
use crate::spec::FrameSpec;
use crate::transport::{is_timeout, Transport};
use crate::utils::format_hex_bytes;

/// Default upper bound on a declared body length.
pub const DEFAULT_MAX_BODY_LENGTH: usize = 64 * 1024;

/// Maximum number of times a head may be extended for one frame.
pub const MAX_HEAD_EXTENSIONS: usize = 8;

/// Default granularity at which a blocked read re-checks cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Reads frames described by a [`FrameSpec`].
///
/// The assembler holds no stream state between frames; it can be created per
/// call or kept around and reused.
#[derive(Debug, Clone)]
pub struct FrameAssembler<'a, S: FrameSpec + ?Sized> {
    spec: &'a S,
    max_body_length: usize,
    poll_interval: Duration,
    cancel: Option<&'a CancelToken>,
}

impl<'a, S: FrameSpec + ?Sized> FrameAssembler<'a, S> {
    /// Creates an assembler for `spec` with default limits.
    pub fn new(spec: &'a S) -> Self {
        Self {
            spec,
            max_body_length: DEFAULT_MAX_BODY_LENGTH,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }

    /// Sets the largest body length accepted (default 64 KiB).
    pub fn with_max_body_length(mut self, max_body_length: usize) -> Self {
        self.max_body_length = max_body_length;
        self
    }

    /// Sets how often a blocked read re-checks the cancel token.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Aborts the read with [`LinkError::Cancelled`] once `cancel` fires.
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Returns the framing rules this assembler uses.
    pub fn spec(&self) -> &'a S {
        self.spec
    }

    /// Reads one complete frame.
    ///
    /// # Arguments
    ///
    /// * `source` - Stream to read from
    /// * `sent` - The request this frame answers, for specs that derive the
    ///   body length from it
    /// * `token` - Expected session token, for specs that authenticate heads
    /// * `timeout` - Budget for the whole frame, head and body together
    ///
    /// # Errors
    ///
    /// - [`LinkError::Timeout`] if the frame is not complete in time
    /// - [`LinkError::ConnectionClosed`] if the peer closes the stream
    /// - [`LinkError::InvalidHeader`] if the head fails validation or stays
    ///   misaligned
    /// - [`LinkError::BodyLength`] if the declared length is unusable
    /// - [`LinkError::UnrecognizedHeader`] if no framing rule covers the head
    /// - [`LinkError::Cancelled`] if the cancel token fires
    pub fn read_frame<T: Transport + ?Sized>(
        &self,
        source: &mut T,
        sent: Option<&[u8]>,
        token: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Frame> {
        let spec = self.spec;
        let protocol = spec.name();
        let header_length = spec.header_length();
        let mut reader = StreamReader::new(source, timeout, self.cancel, self.poll_interval);

        let mut head = vec![0u8; header_length];
        reader.fill(&mut head)?;
        self.realign(&mut reader, &mut head)?;

        if !spec.validate_header(&head, token) {
            return Err(LinkError::invalid_header(format!(
                "{protocol}: header [{}] failed validation",
                format_hex_bytes(&head)
            )));
        }

        let body_length = self.resolve_body_length(&mut reader, &mut head, sent)?;
        if body_length > self.max_body_length {
            return Err(LinkError::body_length(format!(
                "{protocol}: declared body of {body_length} bytes exceeds limit of {}",
                self.max_body_length
            )));
        }

        if body_length == 0 {
            trace!(protocol, head = %format_hex_bytes(&head), "frame received");
            return Ok(Frame::new(head, Vec::new()));
        }

        let mut body = vec![0u8; body_length];
        reader.fill(&mut body)?;
        trace!(
            protocol,
            head = %format_hex_bytes(&head),
            body = %format_hex_bytes(&body),
            "frame received"
        );
        Ok(Frame::new(head, body))
    }

    /// Drops leading junk bytes once and refills the head.
    fn realign<T: Transport + ?Sized>(
        &self,
        reader: &mut StreamReader<'_, T>,
        head: &mut Vec<u8>,
    ) -> Result<()> {
        let protocol = self.spec.name();
        let header_length = head.len();
        let shift = self.spec.misalignment(head);
        if shift == 0 {
            return Ok(());
        }
        if shift >= header_length {
            return Err(LinkError::invalid_header(format!(
                "{protocol}: cannot drop {shift} bytes from a {header_length}-byte head"
            )));
        }

        debug!(
            protocol,
            shift,
            dropped = %format_hex_bytes(&head[..shift]),
            "realigning misaligned head"
        );
        head.drain(..shift);
        head.resize(header_length, 0);
        reader.fill(&mut head[header_length - shift..])?;

        if self.spec.misalignment(head) > 0 {
            return Err(LinkError::invalid_header(format!(
                "{protocol}: head [{}] still misaligned after dropping {shift} bytes",
                format_hex_bytes(head)
            )));
        }
        Ok(())
    }

    /// Computes the body length, extending the head on demand.
    fn resolve_body_length<T: Transport + ?Sized>(
        &self,
        reader: &mut StreamReader<'_, T>,
        head: &mut Vec<u8>,
        sent: Option<&[u8]>,
    ) -> Result<usize> {
        let protocol = self.spec.name();
        let mut extensions = 0;
        loop {
            match self.spec.body_length(head, sent) {
                Ok(length) => return Ok(length),
                Err(LinkError::Incomplete { needed }) => {
                    if extensions == MAX_HEAD_EXTENSIONS || needed > self.max_body_length {
                        return Err(LinkError::body_length(format!(
                            "{protocol}: head still incomplete after {extensions} extensions"
                        )));
                    }
                    extensions += 1;
                    let start = head.len();
                    head.resize(start + needed, 0);
                    reader.fill(&mut head[start..])?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reads exactly `n` bytes, waiting at most `timeout` in total.
///
/// # Errors
///
/// Returns [`LinkError::Timeout`] if fewer than `n` bytes arrive in time and
/// [`LinkError::ConnectionClosed`] if the peer closes the stream first.
///
/// # Example
///
/// ```
/// use plc_link::{read_exact, ScriptedTransport};
/// use std::time::Duration;
///
/// let mut source = ScriptedTransport::new();
/// source.push_bytes([1, 2]);
/// source.push_bytes([3, 4, 5]);
///
/// let bytes = read_exact(&mut source, 4, Duration::from_millis(50)).unwrap();
/// assert_eq!(bytes, vec![1, 2, 3, 4]);
/// ```
pub fn read_exact<T: Transport + ?Sized>(
    source: &mut T,
    n: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    StreamReader::new(source, timeout, None, DEFAULT_POLL_INTERVAL).fill(&mut buf)?;
    Ok(buf)
}

/// Deadline-bounded reader over one frame.
struct StreamReader<'r, T: Transport + ?Sized> {
    source: &'r mut T,
    deadline: Instant,
    cancel: Option<&'r CancelToken>,
    poll_interval: Duration,
    received: usize,
}

impl<'r, T: Transport + ?Sized> StreamReader<'r, T> {
    fn new(
        source: &'r mut T,
        timeout: Duration,
        cancel: Option<&'r CancelToken>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            deadline: Instant::now() + timeout,
            cancel,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            received: 0,
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(LinkError::Cancelled);
            }
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::Timeout);
            }
            let wait = match self.cancel {
                Some(_) => remaining.min(self.poll_interval),
                None => remaining,
            };

            match self.source.read(&mut buf[filled..], wait) {
                Ok(0) => {
                    if self.received > 0 {
                        warn!(received = self.received, "peer closed stream mid-frame");
                    }
                    return Err(LinkError::ConnectionClosed {
                        received: self.received,
                    });
                }
                Ok(n) => {
                    filled += n;
                    self.received += n;
                }
                Err(e) if is_timeout(&e) || e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(LinkError::from_io(e, self.received)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Dlt645, FieldWidth, LengthField, ModbusRtu, ModbusTcp, Mqtt};
    use crate::transport::ScriptedTransport;
    use std::thread;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn source(chunks: &[&[u8]]) -> ScriptedTransport {
        let source = ScriptedTransport::new();
        for chunk in chunks {
            source.push_bytes(chunk.to_vec());
        }
        source
    }

    #[test]
    fn test_head_and_body_in_one_chunk() {
        let mut src = source(&[&[0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xAA, 0xBB, 0xCC]]);
        let spec = LengthField::new(6, 4, FieldWidth::U16);
        let frame = FrameAssembler::new(&spec)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert_eq!(frame.body(), &[0xAA, 0xBB]);
        assert_eq!(src.pending(), 1);
    }

    #[test]
    fn test_zero_length_body_skips_second_read() {
        let mut src = source(&[&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]]);
        let spec = LengthField::new(6, 4, FieldWidth::U16);
        let frame = FrameAssembler::new(&spec)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert!(frame.body().is_empty());
        assert_eq!(src.read_count(), 1);
    }

    #[test]
    fn test_invalid_header() {
        let mut src = source(&[&[0x01, 0x00, 0x00, 0x00]]);
        let spec = LengthField::new(4, 2, FieldWidth::U16).with_magic([0x03, 0x00]);
        let err = FrameAssembler::new(&spec)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidHeader { .. }));
    }

    #[test]
    fn test_body_over_limit() {
        let mut src = source(&[&[0x00, 0x00, 0xFF, 0xFF]]);
        let spec = LengthField::new(4, 2, FieldWidth::U16);
        let err = FrameAssembler::new(&spec)
            .with_max_body_length(1024)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::BodyLength { .. }));
    }

    #[test]
    fn test_short_head_times_out() {
        let mut src = source(&[&[0x00, 0x01, 0x00]]);
        let start = Instant::now();
        let err = FrameAssembler::new(&ModbusTcp)
            .read_frame(&mut src, None, None, Duration::from_millis(40))
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_clean_close_and_torn_frame() {
        let mut clean = ScriptedTransport::new();
        clean.push_close();
        let err = FrameAssembler::new(&ModbusTcp)
            .read_frame(&mut clean, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::ConnectionClosed { received: 0 }));

        let mut torn = source(&[&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x02]]);
        torn.push_close();
        let err = FrameAssembler::new(&ModbusTcp)
            .read_frame(&mut torn, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::ConnectionClosed { received: 9 }));
    }

    #[test]
    fn test_exception_reads_two_body_bytes() {
        // Byte count would say 0x40 for a normal read reply
        let mut src = source(&[&[0x01, 0x83, 0x40, 0x12, 0x34, 0xFF, 0xFF]]);
        let frame = FrameAssembler::new(&ModbusRtu)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert_eq!(frame.body(), &[0x12, 0x34]);
        assert_eq!(src.pending(), 2);
    }

    #[test]
    fn test_modbus_pad_byte_realigned() {
        let mut src = source(&[
            &[0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01],
            &[0x03, 0x02, 0x00, 0x2A],
        ]);
        let frame = FrameAssembler::new(&ModbusTcp)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert_eq!(frame.head(), &[0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03]);
        assert_eq!(frame.body(), &[0x02, 0x00, 0x2A]);
    }

    #[test]
    fn test_realign_happens_once() {
        let mut src = source(&[&[0x00; 16]]);
        let err = FrameAssembler::new(&ModbusTcp)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidHeader { .. }));
    }

    #[test]
    fn test_dlt645_wake_up_bytes() {
        let mut src = source(&[&[
            0xFE, 0xFE, 0x68, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x68, 0x91, 0x02, 0xAA, 0xBB,
            0xCC, 0x16,
        ]]);
        let frame = FrameAssembler::new(&Dlt645)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert_eq!(frame.head()[0], 0x68);
        assert_eq!(frame.body(), &[0xAA, 0xBB, 0xCC, 0x16]);
    }

    #[test]
    fn test_head_extension() {
        // PUBLISH with a two-byte remaining length of 130
        let mut packet = vec![0x30, 0x82, 0x01];
        packet.extend(std::iter::repeat(0x55).take(130));
        let mut src = source(&[&packet[..2], &packet[2..]]);

        let frame = FrameAssembler::new(&Mqtt)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap();
        assert_eq!(frame.head(), &[0x30, 0x82, 0x01]);
        assert_eq!(frame.body().len(), 130);
    }

    #[test]
    fn test_precancelled_read() {
        let token = CancelToken::new();
        token.cancel();
        let mut src = source(&[&[0x03, 0x00, 0x00, 0x04]]);
        let err = FrameAssembler::new(&ModbusTcp)
            .with_cancel(&token)
            .read_frame(&mut src, None, None, TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, LinkError::Cancelled));
        assert_eq!(src.pending(), 4);
    }

    #[test]
    fn test_cancel_unblocks_read() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let mut src = ScriptedTransport::new();
        let start = Instant::now();
        let err = FrameAssembler::new(&ModbusTcp)
            .with_cancel(&token)
            .with_poll_interval(Duration::from_millis(5))
            .read_frame(&mut src, None, None, Duration::from_secs(10))
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, LinkError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_read_exact_zero() {
        let mut src = ScriptedTransport::new();
        assert!(read_exact(&mut src, 0, TIMEOUT).unwrap().is_empty());
        assert_eq!(src.read_count(), 0);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let mut src = ScriptedTransport::new();
        src.push_error(io::ErrorKind::Interrupted);
        src.push_bytes([7, 8]);
        assert_eq!(read_exact(&mut src, 2, TIMEOUT).unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut src = source(&[&[1]]);
        src.push_error(io::ErrorKind::ConnectionReset);
        let err = read_exact(&mut src, 2, TIMEOUT).unwrap_err();
        assert!(matches!(err, LinkError::Transport(_)));
    }
}
