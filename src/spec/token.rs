//! Session-token framing for the simplified network message protocol.
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-3 | Protocol code (little-endian) |
//! | 4-7 | Custom code, echoed by the server (little-endian) |
//! | 8-11 | Reserved |
//! | 12-27 | Session token |
//! | 28-31 | Body length (little-endian, signed) |

use super::{non_negative, require, FrameSpec};
use crate::error::Result;
use crate::utils::{read_i32_le, read_u32_le};

/// Length of the session token carried in every head.
pub const SESSION_TOKEN_LEN: usize = 16;

const TOKEN_OFFSET: usize = 12;

/// Simplified network messages authenticated by a 16-byte session token.
///
/// Without an expected token every head validates; with one, bytes 12..28
/// must match it exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyNet;

impl FrameSpec for SimplifyNet {
    fn name(&self) -> &'static str {
        "simplify-net"
    }

    fn header_length(&self) -> usize {
        32
    }

    fn validate_header(&self, head: &[u8], token: Option<&[u8]>) -> bool {
        if head.len() < 32 {
            return false;
        }
        match token {
            Some(expected) => {
                expected.len() == SESSION_TOKEN_LEN
                    && head[TOKEN_OFFSET..TOKEN_OFFSET + SESSION_TOKEN_LEN] == *expected
            }
            None => true,
        }
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let length = require(read_i32_le(head, 28), head, 32)?;
        non_negative(i64::from(length), self.name())
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        read_u32_le(head, 4).unwrap_or(0)
    }
}
