//! Utility functions for reading header fields.
//!
//! Every reader is bounded: an out-of-range offset yields `None` instead of
//! panicking, so protocol rules can be written against untrusted heads.
//!
//! # Example
//!
//! ```
//! use plc_link::utils::{read_u16_be, read_u16_le, parse_ascii_hex, format_hex_bytes};
//!
//! let head = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06];
//!
//! assert_eq!(read_u16_be(&head, 4), Some(6));
//! assert_eq!(read_u16_le(&head, 4), Some(0x0600));
//! assert_eq!(read_u16_be(&head, 5), None);
//!
//! assert_eq!(parse_ascii_hex(b"1A"), Some(0x1A));
//! assert_eq!(format_hex_bytes(&head[..2]), "00 01");
//! ```

/// Returns the `N` bytes at `offset`, or `None` if the slice is too short.
fn field<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    data.get(offset..end)?.try_into().ok()
}

/// Reads a big-endian `u16` at `offset`.
///
/// # Example
///
/// ```
/// use plc_link::utils::read_u16_be;
///
/// assert_eq!(read_u16_be(&[0x12, 0x34], 0), Some(0x1234));
/// assert_eq!(read_u16_be(&[0x12], 0), None);
/// ```
pub fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    field(data, offset).map(u16::from_be_bytes)
}

/// Reads a little-endian `u16` at `offset`.
pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    field(data, offset).map(u16::from_le_bytes)
}

/// Reads a little-endian `i16` at `offset`.
pub fn read_i16_le(data: &[u8], offset: usize) -> Option<i16> {
    field(data, offset).map(i16::from_le_bytes)
}

/// Reads a big-endian `u32` at `offset`.
pub fn read_u32_be(data: &[u8], offset: usize) -> Option<u32> {
    field(data, offset).map(u32::from_be_bytes)
}

/// Reads a little-endian `u32` at `offset`.
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    field(data, offset).map(u32::from_le_bytes)
}

/// Reads a big-endian `i32` at `offset`.
pub fn read_i32_be(data: &[u8], offset: usize) -> Option<i32> {
    field(data, offset).map(i32::from_be_bytes)
}

/// Reads a little-endian `i32` at `offset`.
pub fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
    field(data, offset).map(i32::from_le_bytes)
}

/// Parses ASCII hexadecimal digits (either case) into a number.
///
/// Returns `None` for empty input, non-hex characters, or more than eight digits.
///
/// # Example
///
/// ```
/// use plc_link::utils::parse_ascii_hex;
///
/// assert_eq!(parse_ascii_hex(b"03"), Some(3));
/// assert_eq!(parse_ascii_hex(b"00ff"), Some(255));
/// assert_eq!(parse_ascii_hex(b"0G"), None);
/// ```
pub fn parse_ascii_hex(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &c| {
        let nibble = (c as char).to_digit(16)?;
        Some((acc << 4) | nibble)
    })
}

/// Parses ASCII decimal digits into a number.
///
/// Returns `None` for empty input, non-digit characters, or overflow.
pub fn parse_ascii_decimal(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &c| {
        let digit = (c as char).to_digit(10)?;
        acc.checked_mul(10)?.checked_add(digit)
    })
}

/// Formats bytes as space-separated uppercase hex pairs.
///
/// # Example
///
/// ```
/// use plc_link::utils::format_hex_bytes;
///
/// assert_eq!(format_hex_bytes(&[0x46, 0x49, 0x4E, 0x53]), "46 49 4E 53");
/// assert_eq!(format_hex_bytes(&[]), "");
/// ```
pub fn format_hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rounds a count up to the next even number.
pub fn round_up_even(value: usize) -> usize {
    value + (value % 2)
}
