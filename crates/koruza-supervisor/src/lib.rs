//! Device supervision for a KORUZA alignment unit.
//!
//! The supervisor owns the links to the motor controller and the
//! accelerometer, tracks whether each peer is alive, keeps the last known
//! motor position persisted so it can be restored after a controller reset,
//! and bins received optical power into an alignment survey grid.
//!
//! All timing is driven by the caller passing `Instant`s into
//! [`DeviceSupervisor::poll`]; nothing here spawns threads.

pub mod config;
pub mod error;
pub mod link;
pub mod peer;
pub mod position;
pub mod status;
pub mod supervisor;
pub mod survey;

pub use config::{ConfigStore, JsonConfigStore, MemoryConfigStore, SupervisorConfig};
pub use error::{ConfigError, Result, SupervisorError};
pub use link::PeerLink;
pub use peer::{PeerId, PeerState};
pub use position::MotorStatus;
pub use status::{CameraCalibration, PeerStatus, SfpStatus, StatusSnapshot};
pub use supervisor::DeviceSupervisor;
pub use survey::{SurveyGrid, SurveyPoint, SurveySnapshot};
