//! Fuji framing: SPB (ASCII, MICREX-F compatible) and SPH (binary, MICREX-SX).

use super::{require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::{parse_ascii_hex, read_u16_le};

/// Fuji SPB ASCII frames.
///
/// Head: `':'`, two station characters, two hex characters giving the data
/// length in bytes. Each byte is sent as two characters and the frame ends
/// with CR LF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FujiSpb;

impl FrameSpec for FujiSpb {
    fn name(&self) -> &'static str {
        "fuji-spb"
    }

    fn header_length(&self) -> usize {
        5
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 5 && head[0] == b':'
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let digits = require(head.get(3..5), head, 5)?;
        let length = parse_ascii_hex(digits).ok_or_else(|| {
            LinkError::body_length(format!(
                "fuji-spb: length field {:?} is not hex",
                String::from_utf8_lossy(digits)
            ))
        })?;
        Ok(length as usize * 2 + 2)
    }
}

/// Fuji SPH binary frames.
///
/// 20-byte head starting with `FB 80`; the little-endian length of the
/// command data follows at bytes 18-19.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FujiSph;

impl FrameSpec for FujiSph {
    fn name(&self) -> &'static str {
        "fuji-sph"
    }

    fn header_length(&self) -> usize {
        20
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 20 && head[0] == 0xFB && head[1] == 0x80
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_le(head, 18), head, 20).map(usize::from)
    }
}
