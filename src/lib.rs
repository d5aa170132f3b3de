//! # PLC Link
//!
//! Message framing and serialized transactions for industrial device protocols.
//!
//! This is a **framing-only** library: it cuts complete frames out of a byte
//! stream and pairs every request with its reply. Building requests and
//! decoding reply payloads belongs to the vendor codecs on top of it.
//! Each call produces at most 1 request and 1 frame.
//! No automatic retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Protocol catalogue** - framing rules for Modbus, MELSEC, S7, FINS, EtherNet/IP,
//!   ADS, SRTP, FEnet, MEMOBUS, robot controllers, meters and more
//! - **Serialized** - one transaction in flight per connection, lock wait bounded
//! - **Bounded** - one receive budget per reply, head and body together
//! - **Correlated** - replies are matched against the request just sent
//! - **No panics** - every error returned as `Result<T, LinkError>`
//! - **Pluggable transport** - TCP out of the box, in-memory script for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use plc_link::spec::ModbusTcp;
//! use plc_link::{RunnerConfig, TcpTransport, TransactionRunner};
//! use std::time::Duration;
//!
//! fn main() -> plc_link::Result<()> {
//!     let transport = TcpTransport::connect("192.168.1.10:502".parse().unwrap(), Duration::from_secs(2))?;
//!     let runner = TransactionRunner::new(transport, RunnerConfig::new());
//!
//!     // Read holding register 0 of unit 1
//!     let request = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
//!     let reply = runner.send_and_receive(&request, &ModbusTcp)?;
//!     println!("reply = {:02X?}", reply);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Framing
//!
//! Every protocol is a [`FrameSpec`]. The [`FrameAssembler`] reads
//! `header_length()` bytes, validates them, asks the [`FrameSpec`] for the body length
//! and reads the body:
//!
//! ```
//! use plc_link::spec::{FieldWidth, LengthField};
//! use plc_link::{FrameAssembler, ScriptedTransport};
//! use std::time::Duration;
//!
//! let mut source = ScriptedTransport::new();
//! source.push_bytes([0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 1, 2, 3, 4, 5]);
//!
//! let spec = LengthField::new(6, 4, FieldWidth::U16);
//! let frame = FrameAssembler::new(&spec)
//!     .read_frame(&mut source, None, None, Duration::from_millis(100))?;
//! assert_eq!(frame.body(), &[1, 2, 3, 4, 5]);
//! # Ok::<(), plc_link::LinkError>(())
//! ```
//!
//! ## Transactions
//!
//! [`TransactionRunner`] owns one transport and serializes access to it:
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | [`execute`](TransactionRunner::execute) | Send, then read one frame unless fire-and-forget |
//! | [`send`](TransactionRunner::send) | Send without reading |
//! | [`send_and_receive`](TransactionRunner::send_and_receive) | Send and return the reply bytes |
//! | [`exchange`](TransactionRunner::exchange) | Send and return the reply as a [`Frame`] |
//! | [`receive`](TransactionRunner::receive) | Read one unsolicited frame |
//!
//! ## Error Handling
//!
//! All operations return `Result<T, LinkError>`:
//!
//! ```no_run
//! use plc_link::spec::ModbusTcp;
//! use plc_link::{LinkError, RunnerConfig, TcpTransport, TransactionRunner};
//! use std::time::Duration;
//!
//! # let transport = TcpTransport::connect("192.168.1.10:502".parse().unwrap(), Duration::from_secs(2)).unwrap();
//! # let runner = TransactionRunner::new(transport, RunnerConfig::new());
//! # let request = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
//! match runner.send_and_receive(&request, &ModbusTcp) {
//!     Ok(reply) => println!("reply: {:02X?}", reply),
//!     Err(LinkError::Timeout) => println!("device did not answer"),
//!     Err(LinkError::Correlation { expected, received }) => {
//!         println!("reply {} does not answer request {}", received, expected)
//!     }
//!     Err(e) if e.is_connection_suspect() => println!("reconnect: {}", e),
//!     Err(e) => println!("error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: hex dumps of requests and frames at
//! `TRACE`, lock, purge and realignment at `DEBUG`, correlation mismatches and
//! torn frames at `WARN`. No subscriber is installed.
//!
//! ## Cargo Features
//!
//! - `tokio` - [`nonblocking::AsyncRunner`], the same transactions on the
//!   blocking thread pool
//! - `serde` - `Serialize`/`Deserialize` for [`RunnerConfig`]

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod assembler;
mod error;
mod frame;
#[cfg(feature = "tokio")]
pub mod nonblocking;
mod runner;
pub mod spec;
mod transport;
pub mod utils;

// Public re-exports
pub use assembler::{
    read_exact, FrameAssembler, DEFAULT_MAX_BODY_LENGTH, DEFAULT_POLL_INTERVAL,
    MAX_HEAD_EXTENSIONS,
};
pub use error::{LinkError, Result};
pub use frame::Frame;
pub use runner::{AccessPolicy, AllowAll, CancelToken, RunnerConfig, TransactionRunner, DEFAULT_TIMEOUT};
pub use spec::FrameSpec;
pub use transport::{ScriptedTransport, TcpTransport, Transport, DEFAULT_CONNECT_TIMEOUT};
