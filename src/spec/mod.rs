//! Per-protocol framing rules.
//!
//! A [`FrameSpec`] tells the [`FrameAssembler`](crate::FrameAssembler) how to
//! cut one message out of a byte stream:
//!
//! 1. [`header_length`](FrameSpec::header_length) - how many bytes to read first
//! 2. [`validate_header`](FrameSpec::validate_header) - signature and token checks
//! 3. [`body_length`](FrameSpec::body_length) - how many bytes follow the head
//! 4. [`correlation_id`](FrameSpec::correlation_id) - which request a head answers
//!
//! Specs are immutable values. Protocols whose reply length depends on the
//! request receive the echoed request explicitly through `body_length`, so one
//! instance can be shared by any number of connections.
//!
//! # Protocol Families
//!
//! | Module | Specs |
//! |--------|-------|
//! | Modbus | [`ModbusTcp`], [`ModbusRtu`] |
//! | Mitsubishi MELSEC | [`MelsecA1EBinary`], [`MelsecA1EAscii`], [`MelsecQna3EBinary`], [`MelsecQna3EAscii`] |
//! | Siemens | [`IsoTcp`], [`FetchWrite`] |
//! | Omron | [`FinsTcp`] |
//! | Fuji | [`FujiSpb`], [`FujiSph`] |
//! | Fieldbus PLCs | [`AllenBradley`], [`AdsNet`], [`GeSrtp`], [`LsisFastEnet`], [`Memobus`] |
//! | Robots | [`KukaVarProxy`], [`Efort`], [`EfortLegacy`] |
//! | Devices | [`Sam`], [`Dlt645`], [`Alien`], [`OpenProtocol`], [`SecsHsms`], [`Mqtt`] |
//! | Session | [`SimplifyNet`] |
//! | Ad hoc | [`LengthField`] |
//!
//! # Example
//!
//! ```
//! use plc_link::spec::{FrameSpec, ModbusTcp};
//!
//! let spec = ModbusTcp;
//! let head = [0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03];
//!
//! assert_eq!(spec.header_length(), 8);
//! assert!(spec.validate_header(&head, None));
//! assert_eq!(spec.body_length(&head, None).unwrap(), 3);
//! assert_eq!(spec.correlation_id(&head), 7);
//! ```

mod device;
mod fieldbus;
mod fuji;
mod generic;
mod melsec;
mod modbus;
mod omron;
mod robot;
mod siemens;
mod token;

pub use device::{Alien, Dlt645, Mqtt, OpenProtocol, Sam, SecsHsms};
pub use fieldbus::{AdsNet, AllenBradley, GeSrtp, LsisFastEnet, Memobus};
pub use fuji::{FujiSph, FujiSpb};
pub use generic::{ByteOrder, FieldWidth, LengthField};
pub use melsec::{MelsecA1EAscii, MelsecA1EBinary, MelsecQna3EAscii, MelsecQna3EBinary};
pub use modbus::{ModbusRtu, ModbusTcp};
pub use omron::FinsTcp;
pub use robot::{Efort, EfortLegacy, KukaVarProxy};
pub use siemens::{FetchWrite, IsoTcp};
pub use token::{SimplifyNet, SESSION_TOKEN_LEN};

use crate::error::{LinkError, Result};

/// Framing rules for one protocol family.
///
/// Implementations must not panic on any input: a head shorter than
/// [`header_length`](Self::header_length) validates `false`, and length
/// computations on short input answer [`LinkError::Incomplete`].
///
/// # Errors from `body_length`
///
/// - [`LinkError::Incomplete`] - more head bytes are needed; the assembler
///   keeps reading
/// - [`LinkError::BodyLength`] - the declared length is negative or inconsistent
/// - [`LinkError::UnrecognizedHeader`] - a head value no rule covers
/// - [`LinkError::InvalidHeader`] - the head contradicts the echoed request
pub trait FrameSpec: Send + Sync {
    /// Short protocol name used in log records.
    fn name(&self) -> &'static str;

    /// Number of bytes read before the head is interpreted.
    fn header_length(&self) -> usize;

    /// Checks the protocol signature and, where the protocol has one, the
    /// session token.
    fn validate_header(&self, head: &[u8], token: Option<&[u8]>) -> bool;

    /// Computes how many body bytes follow `head`.
    ///
    /// `sent` is the request this frame answers, for protocols whose replies
    /// do not carry their own length.
    fn body_length(&self, head: &[u8], sent: Option<&[u8]>) -> Result<usize>;

    /// Extracts the request/response identity from a head.
    ///
    /// Requests share the head layout of their replies, so the same function
    /// is applied to the outbound bytes. Protocols without a multiplexing key
    /// return `0`.
    fn correlation_id(&self, _head: &[u8]) -> u32 {
        0
    }

    /// Number of junk bytes the device put in front of the head.
    ///
    /// The assembler drops them and refills the head at most once per frame.
    fn misalignment(&self, _head: &[u8]) -> usize {
        0
    }
}

impl<S: FrameSpec + ?Sized> FrameSpec for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn header_length(&self) -> usize {
        (**self).header_length()
    }

    fn validate_header(&self, head: &[u8], token: Option<&[u8]>) -> bool {
        (**self).validate_header(head, token)
    }

    fn body_length(&self, head: &[u8], sent: Option<&[u8]>) -> Result<usize> {
        (**self).body_length(head, sent)
    }

    fn correlation_id(&self, head: &[u8]) -> u32 {
        (**self).correlation_id(head)
    }

    fn misalignment(&self, head: &[u8]) -> usize {
        (**self).misalignment(head)
    }
}

/// Unwraps a bounded read, reporting how many bytes are missing up to `end`.
pub(crate) fn require<T>(value: Option<T>, data: &[u8], end: usize) -> Result<T> {
    value.ok_or(LinkError::Incomplete {
        needed: end.saturating_sub(data.len()).max(1),
    })
}

/// Returns the byte at `index` or the number of bytes missing.
pub(crate) fn byte_at(data: &[u8], index: usize) -> Result<u8> {
    require(data.get(index).copied(), data, index.saturating_add(1))
}

/// Converts a signed length into a body length.
pub(crate) fn non_negative(value: i64, protocol: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        LinkError::body_length(format!("{protocol}: declared length {value} is negative"))
    })
}

/// Fetches the echoed request a length rule depends on.
pub(crate) fn echoed<'a>(sent: Option<&'a [u8]>, min_len: usize, protocol: &str) -> Result<&'a [u8]> {
    match sent {
        Some(request) if request.len() >= min_len => Ok(request),
        Some(request) => Err(LinkError::body_length(format!(
            "{protocol}: echoed request too short: expected at least {min_len} bytes, got {}",
            request.len()
        ))),
        None => Err(LinkError::body_length(format!(
            "{protocol}: reply length depends on the request, but none was supplied"
        ))),
    }
}
