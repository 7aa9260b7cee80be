//! Serial byte transports for the KORUZA microcontroller link.
//!
//! This is the lowest layer of the link stack. A transport is a raw,
//! non-blocking byte source/sink bound to one logical peer:
//! - Serial devices via the `serialport` crate (behind the `serial` feature)
//! - In-memory duplex pairs for tests and loopback diagnostics
//!
//! Everything above builds on the [`SerialTransport`] trait provided here.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::SerialTransport;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialPortTransport};
