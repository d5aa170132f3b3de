//! Framing for PLC families with a binary encapsulation header:
//! EtherNet/IP (CIP), Beckhoff ADS, GE SRTP, LS FEnet and Yaskawa MEMOBUS.

use super::{byte_at, non_negative, require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::{read_u16_le, read_u32_le};

/// EtherNet/IP encapsulation header.
///
/// | Byte | Field |
/// |------|-------|
/// | 0-1 | Command |
/// | 2-3 | Length of the command data (little-endian) |
/// | 4-7 | Session handle |
/// | 8-11 | Status |
/// | 12-19 | Sender context, echoed by the target |
/// | 20-23 | Options |
///
/// The low half of the sender context serves as correlation id: targets echo
/// it verbatim, including on `RegisterSession` where the session handle changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllenBradley;

impl FrameSpec for AllenBradley {
    fn name(&self) -> &'static str {
        "ethernet-ip"
    }

    fn header_length(&self) -> usize {
        24
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 24
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_le(head, 2), head, 4).map(usize::from)
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        read_u32_le(head, 12).unwrap_or(0)
    }
}

/// Beckhoff ADS over TCP: two reserved zero bytes and the little-endian AMS
/// packet length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdsNet;

impl FrameSpec for AdsNet {
    fn name(&self) -> &'static str {
        "ads"
    }

    fn header_length(&self) -> usize {
        6
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 6 && head[0] == 0x00 && head[1] == 0x00
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let length = require(read_u32_le(head, 2), head, 6)?;
        usize::try_from(length)
            .map_err(|_| LinkError::body_length(format!("ads: length {length} exceeds address space")))
    }
}

/// GE Series 90 SRTP.
///
/// Every message starts with a 56-byte head; byte 0 is the message type
/// (`0x03` for replies), byte 2 the sequence number echoed from the request
/// and bytes 4-5 the little-endian length of the trailing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeSrtp;

impl FrameSpec for GeSrtp {
    fn name(&self) -> &'static str {
        "ge-srtp"
    }

    fn header_length(&self) -> usize {
        56
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 56 && head[0] == 0x03
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_le(head, 4), head, 6).map(usize::from)
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        head.get(2).copied().map_or(0, u32::from)
    }
}

/// Company id opening every LS XGT FEnet frame.
const LSIS_COMPANY_ID: &[u8; 8] = b"LSIS-XGT";

/// LS Electric XGT FEnet.
///
/// | Byte | Field |
/// |------|-------|
/// | 0-9 | Company id `"LSIS-XGT"` + 2 reserved |
/// | 10-11 | PLC info |
/// | 12 | CPU info |
/// | 13 | Source of frame |
/// | 14-15 | Invoke id (little-endian) |
/// | 16-17 | Length of the application instruction (little-endian) |
/// | 18 | FEnet position |
/// | 19 | Checksum |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LsisFastEnet;

impl FrameSpec for LsisFastEnet {
    fn name(&self) -> &'static str {
        "lsis-fenet"
    }

    fn header_length(&self) -> usize {
        20
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 20 && head.starts_with(LSIS_COMPANY_ID)
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_le(head, 16), head, 18).map(usize::from)
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        read_u16_le(head, 14).map_or(0, u32::from)
    }
}

/// Yaskawa MEMOBUS over Ethernet (218 header).
///
/// Byte 0 is the data type (`0x11` command, `0x19` response), byte 1 the
/// serial number echoed by the controller, bytes 6-7 the little-endian total
/// length including the 12-byte head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Memobus;

impl FrameSpec for Memobus {
    fn name(&self) -> &'static str {
        "memobus"
    }

    fn header_length(&self) -> usize {
        12
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 12 && matches!(head[0], 0x11 | 0x19)
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let total = require(read_u16_le(head, 6), head, 8)?;
        non_negative(i64::from(total) - 12, self.name())
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        byte_at(head, 1).map_or(0, u32::from)
    }
}
