//! Link daemon for KORUZA free-space optical alignment units.
//!
//! A gateway talks to the unit's microcontroller over a serial line. This
//! crate bundles the layers of that link:
//!
//! - [`transport`]: Serial device and in-memory byte transports
//! - [`message`]: TLV messages with a trailing checksum
//! - [`frame`]: Escape-delimited framing over a byte stream
//! - [`supervisor`]: Peer liveness, motor position persistence and the
//!   alignment survey

/// Re-export transport types.
pub mod transport {
    pub use koruza_transport::*;
}

/// Re-export message types.
pub mod message {
    pub use koruza_message::*;
}

/// Re-export frame types.
pub mod frame {
    pub use koruza_frame::*;
}

/// Re-export supervisor types.
pub mod supervisor {
    pub use koruza_supervisor::*;
}
