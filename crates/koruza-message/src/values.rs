//! Typed field values and their fixed big-endian layouts.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

/// Power readings are transmitted in units of 1/10000 mW.
pub const POWER_READING_SCALE: f64 = 10_000.0;

/// Motor position, in motor steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MotorPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl MotorPosition {
    pub const WIRE_SIZE: usize = 12;

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_i32(self.x);
        dst.put_i32(self.y);
        dst.put_i32(self.z);
    }

    pub(crate) fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < Self::WIRE_SIZE {
            return None;
        }
        Some(Self {
            x: src.get_i32(),
            y: src.get_i32(),
            z: src.get_i32(),
        })
    }
}

/// Raw encoder counts for the two aiming axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncoderValue {
    pub x: i32,
    pub y: i32,
}

impl EncoderValue {
    pub const WIRE_SIZE: usize = 8;

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_i32(self.x);
        dst.put_i32(self.y);
    }

    pub(crate) fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < Self::WIRE_SIZE {
            return None;
        }
        Some(Self {
            x: src.get_i32(),
            y: src.get_i32(),
        })
    }
}

/// Raw accelerometer sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccelerometerValue {
    pub ax: i32,
    pub ay: i32,
    pub az: i32,
}

impl AccelerometerValue {
    pub const WIRE_SIZE: usize = 12;

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_i32(self.ax);
        dst.put_i32(self.ay);
        dst.put_i32(self.az);
    }

    pub(crate) fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < Self::WIRE_SIZE {
            return None;
        }
        Some(Self {
            ax: src.get_i32(),
            ay: src.get_i32(),
            az: src.get_i32(),
        })
    }
}

/// Camera crosshair offset relative to the optical axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SfpCalibration {
    pub offset_x: u32,
    pub offset_y: u32,
}

impl SfpCalibration {
    pub const WIRE_SIZE: usize = 8;

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32(self.offset_x);
        dst.put_u32(self.offset_y);
    }

    pub(crate) fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < Self::WIRE_SIZE {
            return None;
        }
        Some(Self {
            offset_x: src.get_u32(),
            offset_y: src.get_u32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_position_layout_is_big_endian() {
        let mut buf = BytesMut::new();
        MotorPosition::new(1, -1, 256).encode(&mut buf);
        assert_eq!(
            buf.as_ref(),
            &[0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 1, 0]
        );
    }

    #[test]
    fn short_values_decode_to_none() {
        assert!(MotorPosition::decode(&[0; 11]).is_none());
        assert!(EncoderValue::decode(&[0; 7]).is_none());
        assert!(AccelerometerValue::decode(&[]).is_none());
        assert!(SfpCalibration::decode(&[0; 4]).is_none());
    }

    #[test]
    fn sfp_calibration_decodes() {
        let mut buf = BytesMut::new();
        SfpCalibration {
            offset_x: 320,
            offset_y: 240,
        }
        .encode(&mut buf);
        let decoded = SfpCalibration::decode(&buf).unwrap();
        assert_eq!((decoded.offset_x, decoded.offset_y), (320, 240));
    }
}
