use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{MessageError, Result};
use crate::tlv::{Command, Reply, Tag, TlvField, MAX_VALUE_LENGTH, TLV_HEADER_SIZE};
use crate::values::{
    AccelerometerValue, EncoderValue, MotorPosition, SfpCalibration, POWER_READING_SCALE,
};

/// Checksum field: header (3) + u32 value (4).
const CHECKSUM_FIELD_SIZE: usize = TLV_HEADER_SIZE + 4;

/// An ordered list of TLV fields.
///
/// Wire format:
/// ```text
/// ┌─────┬────────────┬─────────────┐     ┌─────┬──────────┬──────────┐
/// │ Tag │ Length     │ Value       │ ... │ 0x03│ 0x00 0x04│ Sum (4B) │
/// │ (1B)│ (2B BE)    │ (Length B)  │     │     │          │          │
/// └─────┴────────────┴─────────────┘     └─────┴──────────┴──────────┘
/// ```
///
/// The checksum field is generated by [`Message::serialize`] and consumed by
/// [`Message::parse`]; it never appears in [`Message::fields`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<TlvField>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message carrying a single command.
    pub fn command(command: Command) -> Self {
        let mut msg = Self::new();
        msg.add_command(command);
        msg
    }

    /// Create a message carrying a single reply.
    pub fn reply(reply: Reply) -> Self {
        let mut msg = Self::new();
        msg.add_reply(reply);
        msg
    }

    /// All fields in insertion (or wire) order.
    pub fn fields(&self) -> &[TlvField] {
        &self.fields
    }

    /// Whether the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First field with the given tag.
    pub fn field(&self, tag: Tag) -> Option<&TlvField> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    /// Append a field with an arbitrary tag.
    pub fn add_raw(&mut self, tag: Tag, value: impl Into<Bytes>) -> Result<&mut Self> {
        if tag == Tag::Checksum {
            return Err(MessageError::ReservedTag(tag.into()));
        }
        let value = value.into();
        if value.len() > MAX_VALUE_LENGTH {
            return Err(MessageError::ValueTooLong {
                tag: tag.into(),
                len: value.len(),
            });
        }
        self.fields.push(TlvField { tag, value });
        Ok(self)
    }

    fn push(&mut self, tag: Tag, value: BytesMut) -> &mut Self {
        self.fields.push(TlvField {
            tag,
            value: value.freeze(),
        });
        self
    }

    pub fn add_command(&mut self, command: Command) -> &mut Self {
        let mut value = BytesMut::with_capacity(1);
        value.put_u8(command.into());
        self.push(Tag::Command, value)
    }

    pub fn add_reply(&mut self, reply: Reply) -> &mut Self {
        let mut value = BytesMut::with_capacity(1);
        value.put_u8(reply.into());
        self.push(Tag::Reply, value)
    }

    pub fn add_motor_position(&mut self, position: &MotorPosition) -> &mut Self {
        let mut value = BytesMut::with_capacity(MotorPosition::WIRE_SIZE);
        position.encode(&mut value);
        self.push(Tag::MotorPosition, value)
    }

    pub fn add_encoder_value(&mut self, encoder: &EncoderValue) -> &mut Self {
        let mut value = BytesMut::with_capacity(EncoderValue::WIRE_SIZE);
        encoder.encode(&mut value);
        self.push(Tag::EncoderValue, value)
    }

    pub fn add_accelerometer_value(&mut self, sample: &AccelerometerValue) -> &mut Self {
        let mut value = BytesMut::with_capacity(AccelerometerValue::WIRE_SIZE);
        sample.encode(&mut value);
        self.push(Tag::AccelerometerValue, value)
    }

    pub fn add_sfp_calibration(&mut self, calibration: &SfpCalibration) -> &mut Self {
        let mut value = BytesMut::with_capacity(SfpCalibration::WIRE_SIZE);
        calibration.encode(&mut value);
        self.push(Tag::SfpCalibration, value)
    }

    /// Append a raw power reading (1/10000 mW units).
    pub fn add_power_reading(&mut self, reading: u16) -> &mut Self {
        let mut value = BytesMut::with_capacity(2);
        value.put_u16(reading);
        self.push(Tag::PowerReading, value)
    }

    pub fn add_current_reading(&mut self, reading: u16) -> &mut Self {
        let mut value = BytesMut::with_capacity(2);
        value.put_u16(reading);
        self.push(Tag::CurrentReading, value)
    }

    pub fn add_error_report(&mut self, code: u32) -> &mut Self {
        let mut value = BytesMut::with_capacity(4);
        value.put_u32(code);
        self.push(Tag::ErrorReport, value)
    }

    pub fn command_code(&self) -> Option<Command> {
        self.value(Tag::Command)
            .and_then(|v| v.first().copied())
            .map(Command::from)
    }

    pub fn reply_code(&self) -> Option<Reply> {
        self.value(Tag::Reply)
            .and_then(|v| v.first().copied())
            .map(Reply::from)
    }

    pub fn motor_position(&self) -> Option<MotorPosition> {
        self.value(Tag::MotorPosition).and_then(MotorPosition::decode)
    }

    pub fn encoder_value(&self) -> Option<EncoderValue> {
        self.value(Tag::EncoderValue).and_then(EncoderValue::decode)
    }

    pub fn accelerometer_value(&self) -> Option<AccelerometerValue> {
        self.value(Tag::AccelerometerValue)
            .and_then(AccelerometerValue::decode)
    }

    pub fn sfp_calibration(&self) -> Option<SfpCalibration> {
        self.value(Tag::SfpCalibration)
            .and_then(SfpCalibration::decode)
    }

    pub fn power_reading(&self) -> Option<u16> {
        self.value(Tag::PowerReading).and_then(read_u16)
    }

    /// Power reading converted to milliwatts.
    pub fn power_reading_mw(&self) -> Option<f64> {
        self.power_reading()
            .map(|raw| f64::from(raw) / POWER_READING_SCALE)
    }

    pub fn current_reading(&self) -> Option<u16> {
        self.value(Tag::CurrentReading).and_then(read_u16)
    }

    pub fn error_report(&self) -> Option<u32> {
        self.value(Tag::ErrorReport).and_then(read_u32)
    }

    fn value(&self, tag: Tag) -> Option<&[u8]> {
        self.field(tag).map(|field| field.value.as_ref())
    }

    /// Wire size including the trailing checksum field.
    pub fn serialized_size(&self) -> usize {
        self.fields.iter().map(TlvField::wire_size).sum::<usize>() + CHECKSUM_FIELD_SIZE
    }

    /// Serialize all fields followed by the checksum field.
    pub fn serialize(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.serialized_size());
        self.write_fields(&mut dst);
        dst.freeze()
    }

    /// Append the serialized message to `dst`, returning the number of bytes
    /// written.
    ///
    /// Nothing is written when the message needs more than `capacity` bytes.
    pub fn serialize_into(&self, dst: &mut BytesMut, capacity: usize) -> Result<usize> {
        let size = self.serialized_size();
        if size > capacity {
            return Err(MessageError::BufferTooSmall { size, capacity });
        }
        self.write_fields(dst);
        Ok(size)
    }

    fn write_fields(&self, dst: &mut BytesMut) {
        dst.reserve(self.serialized_size());
        let start = dst.len();
        for field in &self.fields {
            dst.put_u8(field.tag.into());
            dst.put_u16(field.length());
            dst.put_slice(&field.value);
        }
        let sum = checksum(&dst[start..]);
        dst.put_u8(Tag::Checksum.into());
        dst.put_u16(4);
        dst.put_u32(sum);
    }

    /// Parse a serialized message and verify its checksum.
    ///
    /// Bytes following the checksum field are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut fields = Vec::new();
        let mut offset = 0usize;

        while offset < data.len() {
            if data.len() - offset < TLV_HEADER_SIZE {
                return Err(MessageError::Truncated { offset });
            }
            let mut header = &data[offset..offset + TLV_HEADER_SIZE];
            let tag = Tag::from(header.get_u8());
            let length = header.get_u16();

            let value_start = offset + TLV_HEADER_SIZE;
            let value_end = value_start + usize::from(length);
            if value_end > data.len() {
                return Err(MessageError::Truncated { offset });
            }
            let value = &data[value_start..value_end];

            if tag == Tag::Checksum {
                if length != 4 {
                    return Err(MessageError::InvalidChecksumLength(length));
                }
                let mut value = value;
                let expected = value.get_u32();
                let actual = checksum(&data[..offset]);
                if expected != actual {
                    return Err(MessageError::ChecksumMismatch { expected, actual });
                }
                return Ok(Self { fields });
            }

            fields.push(TlvField {
                tag,
                value: Bytes::copy_from_slice(value),
            });
            offset = value_end;
        }

        Err(MessageError::MissingChecksum)
    }
}

fn read_u16(mut value: &[u8]) -> Option<u16> {
    if value.len() < 2 {
        None
    } else {
        Some(value.get_u16())
    }
}

fn read_u32(mut value: &[u8]) -> Option<u32> {
    if value.len() < 4 {
        None
    } else {
        Some(value.get_u32())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<message")?;
        for field in &self.fields {
            write!(f, " {}=", field.tag.name())?;
            let decoded = match field.tag {
                Tag::Command => self.command_code().map(|c| c.name().to_string()),
                Tag::Reply => self.reply_code().map(|r| r.name().to_string()),
                Tag::MotorPosition => MotorPosition::decode(&field.value)
                    .map(|p| format!("({}, {}, {})", p.x, p.y, p.z)),
                Tag::EncoderValue => {
                    EncoderValue::decode(&field.value).map(|e| format!("({}, {})", e.x, e.y))
                }
                Tag::AccelerometerValue => AccelerometerValue::decode(&field.value)
                    .map(|a| format!("({}, {}, {})", a.ax, a.ay, a.az)),
                Tag::SfpCalibration => SfpCalibration::decode(&field.value)
                    .map(|c| format!("({}, {})", c.offset_x, c.offset_y)),
                Tag::PowerReading | Tag::CurrentReading => {
                    read_u16(&field.value).map(|v| v.to_string())
                }
                Tag::ErrorReport => read_u32(&field.value).map(|v| v.to_string()),
                Tag::Checksum | Tag::Unknown(_) => None,
            };
            match decoded {
                Some(text) => write!(f, "{text}")?,
                None => write!(f, "[{} bytes]", field.value.len())?,
            }
        }
        write!(f, ">")
    }
}
