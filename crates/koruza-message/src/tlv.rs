//! Field tags and command/reply codes.
//!
//! Values are wire-stable. New tags and codes are only ever appended; parsers
//! keep fields they do not recognize so older builds tolerate newer peers.

use bytes::Bytes;
use serde::Serialize;

/// Field header: tag (1) + length (2) = 3 bytes.
pub const TLV_HEADER_SIZE: usize = 3;

/// Largest value a single field can carry.
pub const MAX_VALUE_LENGTH: usize = u16::MAX as usize;

/// Field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Command,
    Reply,
    Checksum,
    MotorPosition,
    CurrentReading,
    SfpCalibration,
    ErrorReport,
    PowerReading,
    EncoderValue,
    AccelerometerValue,
    Unknown(u8),
}

impl Tag {
    /// Human-readable tag name.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Command => "command",
            Tag::Reply => "reply",
            Tag::Checksum => "checksum",
            Tag::MotorPosition => "motor-position",
            Tag::CurrentReading => "current-reading",
            Tag::SfpCalibration => "sfp-calibration",
            Tag::ErrorReport => "error-report",
            Tag::PowerReading => "power-reading",
            Tag::EncoderValue => "encoder-value",
            Tag::AccelerometerValue => "accelerometer-value",
            Tag::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            1 => Tag::Command,
            2 => Tag::Reply,
            3 => Tag::Checksum,
            4 => Tag::MotorPosition,
            5 => Tag::CurrentReading,
            6 => Tag::SfpCalibration,
            7 => Tag::ErrorReport,
            8 => Tag::PowerReading,
            9 => Tag::EncoderValue,
            10 => Tag::AccelerometerValue,
            other => Tag::Unknown(other),
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Command => 1,
            Tag::Reply => 2,
            Tag::Checksum => 3,
            Tag::MotorPosition => 4,
            Tag::CurrentReading => 5,
            Tag::SfpCalibration => 6,
            Tag::ErrorReport => 7,
            Tag::PowerReading => 8,
            Tag::EncoderValue => 9,
            Tag::AccelerometerValue => 10,
            Tag::Unknown(other) => other,
        }
    }
}

/// Command codes carried in a `command` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    GetStatus,
    MoveMotor,
    Homing,
    Reboot,
    FirmwareUpgrade,
    RestoreMotor,
    Unknown(u8),
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::GetStatus => "get-status",
            Command::MoveMotor => "move-motor",
            Command::Homing => "homing",
            Command::Reboot => "reboot",
            Command::FirmwareUpgrade => "firmware-upgrade",
            Command::RestoreMotor => "restore-motor",
            Command::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            1 => Command::GetStatus,
            2 => Command::MoveMotor,
            3 => Command::Homing,
            4 => Command::Reboot,
            5 => Command::FirmwareUpgrade,
            6 => Command::RestoreMotor,
            other => Command::Unknown(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        match command {
            Command::GetStatus => 1,
            Command::MoveMotor => 2,
            Command::Homing => 3,
            Command::Reboot => 4,
            Command::FirmwareUpgrade => 5,
            Command::RestoreMotor => 6,
            Command::Unknown(other) => other,
        }
    }
}

/// Reply codes carried in a `reply` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reply {
    StatusReport,
    ErrorReport,
    Unknown(u8),
}

impl Reply {
    pub fn name(self) -> &'static str {
        match self {
            Reply::StatusReport => "status-report",
            Reply::ErrorReport => "error-report",
            Reply::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for Reply {
    fn from(value: u8) -> Self {
        match value {
            1 => Reply::StatusReport,
            2 => Reply::ErrorReport,
            other => Reply::Unknown(other),
        }
    }
}

impl From<Reply> for u8 {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::StatusReport => 1,
            Reply::ErrorReport => 2,
            Reply::Unknown(other) => other,
        }
    }
}

/// A single tag-length-value field.
///
/// The length is always the value's size; it is never stored separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
    pub tag: Tag,
    pub value: Bytes,
}

impl TlvField {
    pub fn new(tag: Tag, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Value length as written on the wire.
    pub fn length(&self) -> u16 {
        // Construction through `Message` bounds values to MAX_VALUE_LENGTH.
        self.value.len().min(MAX_VALUE_LENGTH) as u16
    }

    /// Total wire size of this field (header + value).
    pub fn wire_size(&self) -> usize {
        TLV_HEADER_SIZE + self.value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_codes_roundtrip() {
        for code in 0..=u8::MAX {
            assert_eq!(u8::from(Tag::from(code)), code);
        }
    }

    #[test]
    fn command_codes_are_stable() {
        assert_eq!(u8::from(Command::GetStatus), 1);
        assert_eq!(u8::from(Command::MoveMotor), 2);
        assert_eq!(u8::from(Command::Homing), 3);
        assert_eq!(u8::from(Command::Reboot), 4);
        assert_eq!(u8::from(Command::FirmwareUpgrade), 5);
        assert_eq!(u8::from(Command::RestoreMotor), 6);
        assert_eq!(Command::from(42), Command::Unknown(42));
    }

    #[test]
    fn reply_codes_are_stable() {
        assert_eq!(Reply::from(1), Reply::StatusReport);
        assert_eq!(Reply::from(2), Reply::ErrorReport);
        assert_eq!(Reply::from(9).name(), "unknown");
    }

    #[test]
    fn field_sizes() {
        let field = TlvField::new(Tag::PowerReading, vec![0x01, 0x02]);
        assert_eq!(field.length(), 2);
        assert_eq!(field.wire_size(), 5);
    }
}
