use koruza_message::{AccelerometerValue, POWER_READING_SCALE};
use serde::Serialize;

use crate::peer::PeerId;
use crate::position::MotorStatus;

/// Camera stream location and crosshair calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CameraCalibration {
    pub port: u16,
    pub path: String,
    pub offset_x: u32,
    pub offset_y: u32,
    /// Distance to the remote unit, in metres.
    pub distance: u32,
}

/// Optical transceiver readings, supplied by the transceiver monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SfpStatus {
    pub tx_power_mw: f64,
    pub rx_power_mw: f64,
}

impl SfpStatus {
    /// Receive power in wire units (1/10000 mW), saturating at the field
    /// limits.
    pub fn rx_power_raw(&self) -> u16 {
        let scaled = (self.rx_power_mw * POWER_READING_SCALE).round();
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else if scaled >= f64::from(u16::MAX) {
            u16::MAX
        } else {
            scaled as u16
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerStatus {
    pub peer: PeerId,
    pub attached: bool,
    pub connected: bool,
}

/// Point-in-time view of everything the supervisor tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub id: String,
    /// Whether the motor controller is connected.
    pub connected: bool,
    pub peers: Vec<PeerStatus>,
    pub motors: MotorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<AccelerometerValue>,
    pub camera: CameraCalibration,
    pub sfp: SfpStatus,
}
