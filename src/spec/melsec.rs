//! Mitsubishi MELSEC framing: A-compatible 1E and QnA-compatible 3E frames,
//! each in binary and ASCII encodings.
//!
//! 1E replies carry no length at all: the body size follows from the
//! subheader and the point count of the request being answered.

use super::{byte_at, echoed, require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::{parse_ascii_hex, read_u16_le, round_up_even};

/// 1E end code announcing an abnormal code in the body.
const A1E_ABNORMAL: u8 = 0x5B;

/// Body length of a 1E reply for a response subheader and a requested point count.
fn a1e_body_length(
    subheader: u8,
    points: usize,
    bytes_per_word: usize,
    bit_divisor: usize,
) -> Result<usize> {
    match subheader {
        // Batch bit read: points packed per byte (binary) or one per char (ASCII)
        0x80 => Ok(round_up_even(points) / bit_divisor),
        // Batch word read
        0x81 => Ok(points * bytes_per_word),
        // Batch bit/word write acknowledgements
        0x82 | 0x83 => Ok(0),
        other => Err(LinkError::unrecognized(format!(
            "melsec-a1e: response subheader 0x{other:02X}"
        ))),
    }
}

/// A point count of 0 requests 256 points.
fn a1e_points(count: u32) -> usize {
    if count == 0 {
        256
    } else {
        count as usize
    }
}

/// MELSEC A-compatible 1E frame, binary encoding.
///
/// Head: response subheader, end code. The request point count sits at
/// byte 10 of the echoed request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MelsecA1EBinary;

impl FrameSpec for MelsecA1EBinary {
    fn name(&self) -> &'static str {
        "melsec-a1e-binary"
    }

    fn header_length(&self) -> usize {
        2
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 2 && head[0] & 0x80 != 0
    }

    fn body_length(&self, head: &[u8], sent: Option<&[u8]>) -> Result<usize> {
        let subheader = byte_at(head, 0)?;
        match byte_at(head, 1)? {
            0x00 => {}
            // Abnormal code plus a reserved 0x00
            A1E_ABNORMAL => return Ok(2),
            _ => return Ok(0),
        }

        let request = echoed(sent, 12, self.name())?;
        if subheader.wrapping_sub(0x80) != request[0] {
            return Err(LinkError::invalid_header(format!(
                "melsec-a1e-binary: subheader 0x{subheader:02X} does not answer command 0x{:02X}",
                request[0]
            )));
        }
        a1e_body_length(subheader, a1e_points(u32::from(request[10])), 2, 2)
    }
}

/// MELSEC A-compatible 1E frame, ASCII encoding.
///
/// Every binary byte is sent as two hex characters, so the head is four
/// characters and the request point count sits at characters 20..22.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MelsecA1EAscii;

impl FrameSpec for MelsecA1EAscii {
    fn name(&self) -> &'static str {
        "melsec-a1e-ascii"
    }

    fn header_length(&self) -> usize {
        4
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 4
            && parse_ascii_hex(&head[..2]).is_some_and(|sub| sub & 0x80 != 0)
            && parse_ascii_hex(&head[2..4]).is_some()
    }

    fn body_length(&self, head: &[u8], sent: Option<&[u8]>) -> Result<usize> {
        let subheader = require(head.get(..2).and_then(parse_ascii_hex), head, 2)?;
        let end_code = require(head.get(2..4).and_then(parse_ascii_hex), head, 4)?;
        match end_code {
            0x00 => {}
            // Abnormal code plus reserved byte, two characters each
            0x5B => return Ok(4),
            _ => return Ok(0),
        }

        let request = echoed(sent, 22, self.name())?;
        let command = parse_ascii_hex(&request[..2]).ok_or_else(|| {
            LinkError::body_length("melsec-a1e-ascii: echoed command is not hex")
        })?;
        if subheader.wrapping_sub(0x80) != command {
            return Err(LinkError::invalid_header(format!(
                "melsec-a1e-ascii: subheader {subheader:02X} does not answer command {command:02X}"
            )));
        }
        let points = parse_ascii_hex(&request[20..22]).ok_or_else(|| {
            LinkError::body_length("melsec-a1e-ascii: echoed point count is not hex")
        })?;
        a1e_body_length(subheader as u8, a1e_points(points), 4, 1)
    }
}

/// MELSEC QnA-compatible 3E frame, binary encoding.
///
/// | Byte | Field |
/// |------|-------|
/// | 0-1 | Subheader `D0 00` |
/// | 2 | Network number |
/// | 3 | PC number |
/// | 4-5 | Request destination module I/O |
/// | 6 | Station number |
/// | 7-8 | Response data length (little-endian) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MelsecQna3EBinary;

impl FrameSpec for MelsecQna3EBinary {
    fn name(&self) -> &'static str {
        "melsec-3e-binary"
    }

    fn header_length(&self) -> usize {
        9
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 9 && head[0] == 0xD0 && head[1] == 0x00
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        require(read_u16_le(head, 7), head, 9).map(usize::from)
    }
}

/// MELSEC QnA-compatible 3E frame, ASCII encoding.
///
/// Same fields as [`MelsecQna3EBinary`] spelled as hex characters; the
/// length is four characters at 14..18.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MelsecQna3EAscii;

impl FrameSpec for MelsecQna3EAscii {
    fn name(&self) -> &'static str {
        "melsec-3e-ascii"
    }

    fn header_length(&self) -> usize {
        18
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= 18 && &head[..4] == b"D000"
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let digits = require(head.get(14..18), head, 18)?;
        parse_ascii_hex(digits).map(|n| n as usize).ok_or_else(|| {
            LinkError::body_length(format!(
                "melsec-3e-ascii: length field {:?} is not hex",
                String::from_utf8_lossy(digits)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a1e_request(command: u8, points: u8) -> Vec<u8> {
        vec![command, 0xFF, 0x0A, 0x00, 0x64, 0x00, 0x00, 0x00, 0x20, 0x44, points, 0x00]
    }

    #[test]
    fn test_a1e_binary_word_read() {
        let request = a1e_request(0x01, 10);
        assert_eq!(
            MelsecA1EBinary.body_length(&[0x81, 0x00], Some(&request)).unwrap(),
            20
        );
    }

    #[test]
    fn test_a1e_binary_bit_read_rounds_odd_counts() {
        let request = a1e_request(0x00, 5);
        assert_eq!(
            MelsecA1EBinary.body_length(&[0x80, 0x00], Some(&request)).unwrap(),
            3
        );
    }

    #[test]
    fn test_a1e_binary_256_points() {
        let request = a1e_request(0x01, 0);
        assert_eq!(
            MelsecA1EBinary.body_length(&[0x81, 0x00], Some(&request)).unwrap(),
            512
        );
    }

    #[test]
    fn test_a1e_binary_write_ack_has_no_body() {
        let request = a1e_request(0x03, 4);
        assert_eq!(
            MelsecA1EBinary.body_length(&[0x83, 0x00], Some(&request)).unwrap(),
            0
        );
    }

    #[test]
    fn test_a1e_binary_abnormal_end_code() {
        // No request needed: the error payload size is fixed.
        assert_eq!(MelsecA1EBinary.body_length(&[0x81, 0x5B], None).unwrap(), 2);
        assert_eq!(MelsecA1EBinary.body_length(&[0x81, 0x51], None).unwrap(), 0);
    }

    #[test]
    fn test_a1e_binary_mismatched_command() {
        let request = a1e_request(0x00, 4);
        assert!(matches!(
            MelsecA1EBinary.body_length(&[0x81, 0x00], Some(&request)),
            Err(LinkError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_a1e_binary_requires_request() {
        assert!(matches!(
            MelsecA1EBinary.body_length(&[0x81, 0x00], None),
            Err(LinkError::BodyLength { .. })
        ));
    }

    #[test]
    fn test_a1e_ascii_word_read() {
        let request = b"01FF000A4420000000640A00";
        assert!(MelsecA1EAscii.validate_header(b"8100", None));
        assert_eq!(
            MelsecA1EAscii.body_length(b"8100", Some(request)).unwrap(),
            40
        );
    }

    #[test]
    fn test_a1e_ascii_bit_read() {
        let request = b"00FF000A4420000000640500";
        assert_eq!(MelsecA1EAscii.body_length(b"8000", Some(request)).unwrap(), 6);
    }

    #[test]
    fn test_a1e_ascii_abnormal_end_code() {
        assert_eq!(MelsecA1EAscii.body_length(b"815B", None).unwrap(), 4);
    }

    #[test]
    fn test_a1e_ascii_rejects_non_response() {
        assert!(!MelsecA1EAscii.validate_header(b"0100", None));
        assert!(!MelsecA1EAscii.validate_header(b"8Z00", None));
    }

    #[test]
    fn test_3e_binary() {
        let head = [0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x06, 0x00];
        assert!(MelsecQna3EBinary.validate_header(&head, None));
        assert_eq!(MelsecQna3EBinary.body_length(&head, None).unwrap(), 6);
    }

    #[test]
    fn test_3e_ascii() {
        let head = b"D00000FF03FF00000C";
        assert!(MelsecQna3EAscii.validate_header(head, None));
        assert_eq!(MelsecQna3EAscii.body_length(head, None).unwrap(), 12);
    }

    #[test]
    fn test_3e_ascii_bad_length() {
        let head = b"D00000FF03FF0000XY";
        assert!(matches!(
            MelsecQna3EAscii.body_length(head, None),
            Err(LinkError::BodyLength { .. })
        ));
    }
}
