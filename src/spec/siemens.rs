//! Siemens framing: S7 over ISO-on-TCP (TPKT) and the S5/S7 Fetch/Write protocol.

use super::{byte_at, echoed, require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::read_u16_be;

/// TPKT header length.
pub const TPKT_HEAD: usize = 4;

/// S7 over ISO-on-TCP (RFC 1006).
///
/// The TPKT header is version `0x03`, reserved `0x00` and the big-endian
/// length of the whole packet including itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsoTcp;

impl FrameSpec for IsoTcp {
    fn name(&self) -> &'static str {
        "iso-tcp"
    }

    fn header_length(&self) -> usize {
        TPKT_HEAD
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= TPKT_HEAD && head[0] == 0x03 && head[1] == 0x00
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let total = require(read_u16_be(head, 2), head, 4)? as usize;
        total.checked_sub(TPKT_HEAD).ok_or_else(|| {
            LinkError::body_length(format!("iso-tcp: packet length {total} below TPKT header"))
        })
    }
}

/// Fetch/Write op code of a write acknowledgement.
const OP_WRITE_RESPONSE: u8 = 0x04;
/// Fetch/Write op code of a fetch (read) response.
const OP_FETCH_RESPONSE: u8 = 0x06;

/// Siemens Fetch/Write (S5 protocol over TCP).
///
/// | Byte | Field |
/// |------|-------|
/// | 0-1 | System id `"S5"` |
/// | 2 | Header length (0x10) |
/// | 3-4 | Op code id and length |
/// | 5 | Op code |
/// | 6-7 | Ack block id and length |
/// | 8 | Error number |
/// | 9-15 | Empty block |
///
/// Fetch responses do not state how much data follows: the count comes from
/// the request (area at byte 8, count at bytes 12-13). Data blocks, counters
/// and timers count in words, everything else in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchWrite;

impl FrameSpec for FetchWrite {
    fn name(&self) -> &'static str {
        "fetch-write"
    }

    fn header_length(&self) -> usize {
        16
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 16 && head[0] == 0x53 && head[1] == 0x35
    }

    fn body_length(&self, head: &[u8], sent: Option<&[u8]>) -> Result<usize> {
        match byte_at(head, 5)? {
            OP_WRITE_RESPONSE => Ok(0),
            OP_FETCH_RESPONSE => {
                // A failed fetch carries only the error number.
                if byte_at(head, 8)? != 0x00 {
                    return Ok(0);
                }
                let request = echoed(sent, 14, self.name())?;
                let count = require(read_u16_be(request, 12), request, 14)? as usize;
                match request[8] {
                    // Data block, counter, timer
                    0x01 | 0x06 | 0x07 => Ok(count * 2),
                    _ => Ok(count),
                }
            }
            other => Err(LinkError::unrecognized(format!(
                "fetch-write: op code 0x{other:02X}"
            ))),
        }
    }
}
