//! Omron FINS/TCP framing.
//!
//! FINS over TCP wraps every FINS frame in a 16-byte header:
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-3 | Magic `"FINS"` |
//! | 4-7 | Length of everything after this field (big-endian) |
//! | 8-11 | Command |
//! | 12-15 | Error code |
//!
//! Only the first 8 bytes are needed to delimit the frame; command and error
//! code arrive as part of the body.

use super::{require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::read_i32_be;

/// FINS/TCP magic bytes.
pub const FINS_MAGIC: [u8; 4] = *b"FINS";

/// Omron FINS over TCP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinsTcp;

impl FrameSpec for FinsTcp {
    fn name(&self) -> &'static str {
        "fins-tcp"
    }

    fn header_length(&self) -> usize {
        8
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 8 && head[..4] == FINS_MAGIC
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let length = require(read_i32_be(head, 4), head, 8)?;
        // The command and error code words always follow.
        if length < 8 {
            return Err(LinkError::body_length(format!(
                "fins-tcp: length {length} cannot hold command and error code"
            )));
        }
        Ok(length as usize)
    }
}
