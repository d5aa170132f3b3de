//! Configurable length-field framing for ad hoc binary protocols.

use super::{non_negative, require, FrameSpec};
use crate::error::Result;
use crate::utils::{read_u16_be, read_u16_le, read_u32_be, read_u32_le};

/// Width of a length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// One byte.
    U8,
    /// Two bytes.
    U16,
    /// Four bytes.
    U32,
}

impl FieldWidth {
    /// Number of bytes the field occupies.
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Byte order of a multi-byte length field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// Most significant byte first.
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

/// A head of fixed length carrying the body length at a fixed offset.
///
/// The raw field value plus `adjustment` gives the body length; use a
/// negative adjustment when the field also counts head bytes.
///
/// # Example
///
/// ```
/// use plc_link::spec::{FieldWidth, FrameSpec, LengthField};
///
/// // 6-byte head with a big-endian u16 length at offset 4
/// let spec = LengthField::new(6, 4, FieldWidth::U16);
/// let head = [0x00, 0x00, 0x00, 0x00, 0x00, 0x05];
/// assert_eq!(spec.body_length(&head, None).unwrap(), 5);
///
/// // Same field counting the whole frame
/// let spec = LengthField::new(6, 4, FieldWidth::U16).with_adjustment(-6);
/// let head = [0x00, 0x00, 0x00, 0x00, 0x00, 0x0B];
/// assert_eq!(spec.body_length(&head, None).unwrap(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthField {
    header_length: usize,
    offset: usize,
    width: FieldWidth,
    byte_order: ByteOrder,
    adjustment: i64,
    magic: Vec<u8>,
}

impl LengthField {
    /// Creates a big-endian length field spec.
    pub fn new(header_length: usize, offset: usize, width: FieldWidth) -> Self {
        Self {
            header_length,
            offset,
            width,
            byte_order: ByteOrder::BigEndian,
            adjustment: 0,
            magic: Vec::new(),
        }
    }

    /// Reads the field as little-endian.
    pub fn little_endian(mut self) -> Self {
        self.byte_order = ByteOrder::LittleEndian;
        self
    }

    /// Adds `adjustment` to the raw field value.
    pub fn with_adjustment(mut self, adjustment: i64) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Requires every head to start with `magic`.
    pub fn with_magic(mut self, magic: impl Into<Vec<u8>>) -> Self {
        self.magic = magic.into();
        self
    }

    fn raw_length(&self, head: &[u8]) -> Result<u32> {
        let end = self.offset.saturating_add(self.width.size());
        let value = match (self.width, self.byte_order) {
            (FieldWidth::U8, _) => head.get(self.offset).copied().map(u32::from),
            (FieldWidth::U16, ByteOrder::BigEndian) => read_u16_be(head, self.offset).map(u32::from),
            (FieldWidth::U16, ByteOrder::LittleEndian) => {
                read_u16_le(head, self.offset).map(u32::from)
            }
            (FieldWidth::U32, ByteOrder::BigEndian) => read_u32_be(head, self.offset),
            (FieldWidth::U32, ByteOrder::LittleEndian) => read_u32_le(head, self.offset),
        };
        require(value, head, end)
    }
}

impl FrameSpec for LengthField {
    fn name(&self) -> &'static str {
        "length-field"
    }

    fn header_length(&self) -> usize {
        self.header_length
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= self.header_length && head.starts_with(&self.magic)
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let raw = self.raw_length(head)?;
        non_negative(i64::from(raw).saturating_add(self.adjustment), self.name())
    }
}
