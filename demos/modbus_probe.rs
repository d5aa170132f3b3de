//! Example: Probing a Modbus TCP device
//!
//! Run with: cargo run --example modbus_probe -- 192.168.1.10:502
//!
//! Set `RUST_LOG=plc_link=trace` to see every request and frame as hex.
//!
//! This example demonstrates:
//! - Connecting a TCP transport
//! - Configuring a transaction runner
//! - Reading holding registers
//! - Telling timeouts apart from desynchronized connections

use plc_link::spec::ModbusTcp;
use plc_link::{LinkError, RunnerConfig, TcpTransport, TransactionRunner};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:502".to_string())
        .parse()?;

    // =========================================================================
    // Connect
    // =========================================================================

    let transport = TcpTransport::connect(addr, Duration::from_secs(2))?;
    let config = RunnerConfig::new()
        .with_receive_timeout(Duration::from_secs(1))
        .with_purge_before_send(true);
    let runner = TransactionRunner::new(transport, config);

    // =========================================================================
    // Read holding registers 0..10 of unit 1, one transaction per register
    // =========================================================================

    for register in 0u16..10 {
        let transaction_id = register + 1;
        let mut request = Vec::with_capacity(12);
        request.extend_from_slice(&transaction_id.to_be_bytes());
        request.extend_from_slice(&[0x00, 0x00, 0x00, 0x06, 0x01, 0x03]);
        request.extend_from_slice(&register.to_be_bytes());
        request.extend_from_slice(&1u16.to_be_bytes());

        match runner.exchange(&request, &ModbusTcp) {
            // The head ends with the unit id and function code
            Ok(frame) => match (frame.head()[7], frame.body()) {
                (0x03, [2, hi, lo]) => {
                    println!("HR{} = {}", register, u16::from_be_bytes([*hi, *lo]))
                }
                (function, [exception]) if function & 0x80 != 0 => {
                    println!("HR{} exception 0x{:02X}", register, exception)
                }
                (_, other) => println!("HR{} unexpected reply {:02X?}", register, other),
            },
            Err(LinkError::Timeout) => println!("HR{} timed out", register),
            Err(e) if e.is_connection_suspect() => {
                eprintln!("connection out of sync: {}", e);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
