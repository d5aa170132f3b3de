//! Robot controller framing: KUKA VarProxy and EFORT.

use super::{non_negative, require, FrameSpec};
use crate::error::Result;
use crate::utils::{read_i16_le, read_u16_be};

/// KUKA VarProxy (JOpenShowVar).
///
/// Head: big-endian message id, big-endian length of the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KukaVarProxy;

impl FrameSpec for KukaVarProxy {
    fn name(&self) -> &'static str {
        "kuka-varproxy"
    }

    fn header_length(&self) -> usize {
        4
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 4
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_be(head, 2), head, 4).map(usize::from)
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        read_u16_be(head, 0).map_or(0, u32::from)
    }
}

/// EFORT robot status frames.
///
/// The little-endian signed total length sits at bytes 16-17 and includes
/// the 18-byte head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Efort;

impl FrameSpec for Efort {
    fn name(&self) -> &'static str {
        "efort"
    }

    fn header_length(&self) -> usize {
        18
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 18
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let total = require(read_i16_le(head, 16), head, 18)?;
        non_negative(i64::from(total) - 18, self.name())
    }
}

/// EFORT controllers before the 18-byte head revision: 17-byte head, total
/// length at bytes 15-16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EfortLegacy;

impl FrameSpec for EfortLegacy {
    fn name(&self) -> &'static str {
        "efort-legacy"
    }

    fn header_length(&self) -> usize {
        17
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 17
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let total = require(read_i16_le(head, 15), head, 17)?;
        non_negative(i64::from(total) - 17, self.name())
    }
}
