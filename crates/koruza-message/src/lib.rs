//! Tag-length-value messages for the KORUZA microcontroller link.
//!
//! A message is an ordered list of typed fields. On the wire each field is
//! written as:
//! - A 1-byte tag
//! - A 2-byte big-endian value length
//! - The value bytes
//!
//! Serialization always appends a checksum field last; parsing verifies and
//! strips it, so a [`Message`] in memory never carries its own checksum.

pub mod checksum;
pub mod error;
pub mod message;
pub mod tlv;
pub mod values;

pub use checksum::checksum;
pub use error::{MessageError, Result};
pub use message::Message;
pub use tlv::{Command, Reply, Tag, TlvField, MAX_VALUE_LENGTH, TLV_HEADER_SIZE};
pub use values::{
    AccelerometerValue, EncoderValue, MotorPosition, SfpCalibration, POWER_READING_SCALE,
};
