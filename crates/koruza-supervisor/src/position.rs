use koruza_message::{EncoderValue, MotorPosition};
use serde::Serialize;

/// Aiming motor state as last reported by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotorStatus {
    pub position: MotorPosition,
    pub encoder: EncoderValue,
    /// Largest accepted |x|.
    pub range_x: u32,
    /// Largest accepted |y|.
    pub range_y: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<u32>,
}

impl MotorStatus {
    pub fn new(range_x: u32, range_y: u32) -> Self {
        Self {
            range_x,
            range_y,
            ..Self::default()
        }
    }

    /// Whether `position` lies inside the configured travel on both axes.
    pub fn in_range(&self, position: &MotorPosition) -> bool {
        position.x.unsigned_abs() <= self.range_x && position.y.unsigned_abs() <= self.range_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive_and_symmetric() {
        let status = MotorStatus::new(25_000, 25_000);
        assert!(status.in_range(&MotorPosition::new(25_000, -25_000, 0)));
        assert!(status.in_range(&MotorPosition::new(100, 100, 0)));
        assert!(!status.in_range(&MotorPosition::new(30_000, 100, 0)));
        assert!(!status.in_range(&MotorPosition::new(0, -25_001, 0)));
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let status = MotorStatus::new(u32::MAX, 0);
        assert!(status.in_range(&MotorPosition::new(i32::MIN, 0, 0)));
        assert!(!status.in_range(&MotorPosition::new(0, i32::MIN, 0)));
    }

    #[test]
    fn z_is_not_range_checked() {
        let status = MotorStatus::new(10, 10);
        assert!(status.in_range(&MotorPosition::new(0, 0, i32::MAX)));
    }
}
