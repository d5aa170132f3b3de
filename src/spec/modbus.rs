//! Modbus framing: TCP (MBAP) and RTU replies carried over a stream.

use super::{byte_at, require, FrameSpec};
use crate::error::{LinkError, Result};
use crate::utils::read_u16_be;

/// MBAP header plus function code.
pub const MODBUS_TCP_HEAD: usize = 8;

/// Modbus TCP (MBAP) framing.
///
/// | Byte | Field |
/// |------|-------|
/// | 0-1 | Transaction id (big-endian) |
/// | 2-3 | Protocol id (always 0) |
/// | 4-5 | Length of unit id + PDU (big-endian) |
/// | 6 | Unit id |
/// | 7 | Function code |
///
/// Some gateways emit a stray leading byte. A raw length field of zero is
/// never legal, so it marks a head shifted by one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModbusTcp;

impl FrameSpec for ModbusTcp {
    fn name(&self) -> &'static str {
        "modbus-tcp"
    }

    fn header_length(&self) -> usize {
        MODBUS_TCP_HEAD
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        head.len() >= MODBUS_TCP_HEAD && head[2] == 0x00 && head[3] == 0x00
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let length = require(read_u16_be(head, 4), head, 6)?;
        // The length field covers the unit id and function code already in the head.
        match length.checked_sub(2) {
            Some(body) => Ok(body as usize),
            None => Err(LinkError::body_length(format!(
                "modbus-tcp: length field {length} is shorter than unit id and function code"
            ))),
        }
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        read_u16_be(head, 0).map_or(0, u32::from)
    }

    fn misalignment(&self, head: &[u8]) -> usize {
        match read_u16_be(head, 4) {
            Some(0) => 1,
            _ => 0,
        }
    }
}

/// Modbus RTU replies: station, function code and the first PDU byte.
///
/// The body always ends with the two CRC bytes. Exception replies (function
/// code with bit 7 set) carry their exception code in the head, so only the
/// CRC follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModbusRtu;

impl FrameSpec for ModbusRtu {
    fn name(&self) -> &'static str {
        "modbus-rtu"
    }

    fn header_length(&self) -> usize {
        3
    }

    fn validate_header(&self, head: &[u8], _token: Option<&[u8]>) -> bool {
        // Station 0 is broadcast and never answers.
        head.len() >= 3 && head[0] != 0x00
    }

    fn body_length(&self, head: &[u8], _sent: Option<&[u8]>) -> Result<usize> {
        let function = byte_at(head, 1)?;
        if function & 0x80 != 0 {
            return Ok(2);
        }

        match function {
            // Read coils/discretes/holding/input, read-write multiple: byte count + CRC
            0x01..=0x04 | 0x17 => Ok(byte_at(head, 2)? as usize + 2),
            // Write single/multiple echo: rest of address, value/quantity, CRC
            0x05 | 0x06 | 0x0F | 0x10 => Ok(5),
            other => Err(LinkError::unrecognized(format!(
                "modbus-rtu: function code 0x{other:02X}"
            ))),
        }
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        head.first().copied().map_or(0, u32::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modbus_tcp_body_length() {
        let head = [0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03];
        assert!(ModbusTcp.validate_header(&head, None));
        assert_eq!(ModbusTcp.body_length(&head, None).unwrap(), 5);
        assert_eq!(ModbusTcp.misalignment(&head), 0);
    }

    #[test]
    fn test_modbus_tcp_rejects_protocol_id() {
        let head = [0x00, 0x01, 0x00, 0x01, 0x00, 0x07, 0x01, 0x03];
        assert!(!ModbusTcp.validate_header(&head, None));
        assert!(!ModbusTcp.validate_header(&head[..4], None));
    }

    #[test]
    fn test_modbus_tcp_short_length_field() {
        let head = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x03];
        assert!(matches!(
            ModbusTcp.body_length(&head, None),
            Err(LinkError::BodyLength { .. })
        ));
    }

    #[test]
    fn test_modbus_tcp_misaligned_head() {
        // Pad byte pushes the length high byte into position 5.
        let head = [0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01];
        assert_eq!(ModbusTcp.misalignment(&head), 1);
    }

    #[test]
    fn test_modbus_tcp_correlation() {
        let head = [0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03];
        assert_eq!(ModbusTcp.correlation_id(&head), 0x1234);
        assert_eq!(ModbusTcp.correlation_id(&[0x12]), 0);
    }

    #[test]
    fn test_modbus_rtu_read_reply() {
        let head = [0x01, 0x03, 0x04];
        assert_eq!(ModbusRtu.body_length(&head, None).unwrap(), 6);
        assert_eq!(ModbusRtu.correlation_id(&head), 1);
    }

    #[test]
    fn test_modbus_rtu_write_echo() {
        let head = [0x01, 0x10, 0x00];
        assert_eq!(ModbusRtu.body_length(&head, None).unwrap(), 5);
    }

    #[test]
    fn test_modbus_rtu_exception_short_circuit() {
        // The normal read formula would give 0x40 + 2.
        let head = [0x01, 0x83, 0x40];
        assert_eq!(ModbusRtu.body_length(&head, None).unwrap(), 2);
    }

    #[test]
    fn test_modbus_rtu_unknown_function() {
        let head = [0x01, 0x2B, 0x0E];
        assert!(matches!(
            ModbusRtu.body_length(&head, None),
            Err(LinkError::UnrecognizedHeader { .. })
        ));
    }

    #[test]
    fn test_modbus_rtu_broadcast_station_invalid() {
        assert!(!ModbusRtu.validate_header(&[0x00, 0x03, 0x02], None));
    }
}
