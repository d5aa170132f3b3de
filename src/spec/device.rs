//! Framing for field devices and device-level protocols: ID card readers,
//! energy meters, DTU gateways, tightening controllers, SECS equipment and
//! MQTT brokers.

use super::{byte_at, non_negative, require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::{parse_ascii_decimal, read_u16_be, read_u32_be};

/// Preamble of every SAM (second-generation ID card reader) frame.
const SAM_PREAMBLE: [u8; 5] = [0xAA, 0xAA, 0xAA, 0x96, 0x69];

/// SAM ID card reader modules.
///
/// Head: the fixed preamble `AA AA AA 96 69` and the big-endian length of
/// the rest of the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sam;

impl FrameSpec for Sam {
    fn name(&self) -> &'static str {
        "sam"
    }

    fn header_length(&self) -> usize {
        7
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 7 && head[..5] == SAM_PREAMBLE
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_be(head, 5), head, 7).map(usize::from)
    }
}

/// Wake-up byte meters may send before the frame start.
const DLT645_WAKE_UP: u8 = 0xFE;

/// Upper bound on wake-up bytes in front of a DL/T 645 frame.
const DLT645_MAX_WAKE_UP: usize = 4;

/// DL/T 645 energy meters (2007 edition).
///
/// | Byte | Field |
/// |------|-------|
/// | 0 | Start `0x68` |
/// | 1-6 | Meter address (BCD, low byte first) |
/// | 7 | Start `0x68` |
/// | 8 | Control code |
/// | 9 | Data length |
///
/// The body is the data field, the checksum and the end byte `0x16`. Up to
/// four `0xFE` wake-up bytes may precede the frame; they are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dlt645;

impl FrameSpec for Dlt645 {
    fn name(&self) -> &'static str {
        "dlt645"
    }

    fn header_length(&self) -> usize {
        10
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 10 && head[0] == 0x68 && head[7] == 0x68
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        Ok(byte_at(head, 9)? as usize + 2)
    }

    fn misalignment(&self, head: &[u8]) -> usize {
        head.iter()
            .take(DLT645_MAX_WAKE_UP)
            .take_while(|&&b| b == DLT645_WAKE_UP)
            .count()
    }
}

/// DTU "alien" registration frames pushed by cellular gateways on connect.
///
/// Head: `0x48`, three reserved bytes, the length of the registration data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alien;

impl FrameSpec for Alien {
    fn name(&self) -> &'static str {
        "alien"
    }

    fn header_length(&self) -> usize {
        5
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 5 && head[0] == 0x48
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        Ok(byte_at(head, 4)? as usize)
    }
}

/// Atlas Copco Open Protocol.
///
/// Messages start with four ASCII digits giving the message length without
/// the trailing NUL, which is part of the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenProtocol;

impl FrameSpec for OpenProtocol {
    fn name(&self) -> &'static str {
        "open-protocol"
    }

    fn header_length(&self) -> usize {
        4
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 4 && head[..4].iter().all(u8::is_ascii_digit)
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let digits = require(head.get(..4), head, 4)?;
        let length = parse_ascii_decimal(digits).ok_or_else(|| {
            LinkError::body_length(format!(
                "open-protocol: length field {:?} is not decimal",
                String::from_utf8_lossy(digits)
            ))
        })?;
        non_negative(i64::from(length) - 4 + 1, self.name())
    }
}

/// SEMI E37 HSMS: big-endian message length, then a 10-byte message header
/// and the optional SECS-II text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecsHsms;

impl FrameSpec for SecsHsms {
    fn name(&self) -> &'static str {
        "secs-hsms"
    }

    fn header_length(&self) -> usize {
        4
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 4
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let length = require(read_u32_be(head, 0), head, 4)?;
        if length < 10 {
            return Err(LinkError::body_length(format!(
                "secs-hsms: length {length} is shorter than the 10-byte message header"
            )));
        }
        Ok(length as usize)
    }
}

/// MQTT fixed header.
///
/// The remaining length is a variable-length integer of one to four bytes.
/// The head starts with the control byte and the first length byte; every
/// continuation bit asks the assembler for one more head byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mqtt;

impl FrameSpec for Mqtt {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn header_length(&self) -> usize {
        2
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        // Packet type 0 is reserved.
        head.len() >= 2 && head[0] >> 4 != 0
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let mut length = 0usize;
        for (index, shift) in (1..=4).zip((0..).step_by(7)) {
            let encoded = byte_at(head, index)?;
            length |= usize::from(encoded & 0x7F) << shift;
            if encoded & 0x80 == 0 {
                return Ok(length);
            }
        }
        Err(LinkError::body_length(
            "mqtt: remaining length uses more than four bytes",
        ))
    }
}
