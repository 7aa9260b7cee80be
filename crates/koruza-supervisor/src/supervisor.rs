use std::time::Instant;

use koruza_message::{AccelerometerValue, Command, Message, MotorPosition, Reply};
use koruza_transport::SerialTransport;
use tracing::{debug, error, info, warn};

use crate::config::{
    ConfigStore, SupervisorConfig, KEY_DEVICE_ID, KEY_LAST_X, KEY_LAST_Y, KEY_WEBCAM_DISTANCE,
    KEY_WEBCAM_OFFSET_X, KEY_WEBCAM_OFFSET_Y, KEY_WEBCAM_PATH, KEY_WEBCAM_PORT,
};
use crate::error::{Result, SupervisorError};
use crate::link::PeerLink;
use crate::peer::{PeerId, PeerState};
use crate::position::MotorStatus;
use crate::status::{CameraCalibration, PeerStatus, SfpStatus, StatusSnapshot};
use crate::survey::{SurveyGrid, SurveySnapshot};

const DEFAULT_DEVICE_ID: &str = "unknown";
const DEFAULT_WEBCAM_PORT: i64 = 8080;
const DEFAULT_WEBCAM_PATH: &str = "/";

#[derive(Debug, Default)]
struct PeerSlot {
    state: PeerState,
    link: Option<PeerLink>,
}

/// Owns the peer links and every piece of state derived from them.
///
/// Callers drive it by calling [`poll`](Self::poll) from their loop; each
/// call pumps the transports, dispatches received messages, fires expired
/// keepalives and sends the periodic status requests.
#[derive(Debug)]
pub struct DeviceSupervisor<S> {
    config: SupervisorConfig,
    store: S,
    id: String,
    motors_peer: PeerSlot,
    accelerometer_peer: PeerSlot,
    motors: MotorStatus,
    persisted: Option<(i32, i32)>,
    camera: CameraCalibration,
    sfp: SfpStatus,
    last_power: Option<u16>,
    accelerometer: Option<AccelerometerValue>,
    survey: SurveyGrid,
    next_poll: Option<Instant>,
}

impl<S: ConfigStore> DeviceSupervisor<S> {
    /// Create a supervisor, reading settings and the last persisted motor
    /// position from `store`.
    pub fn new(store: S) -> Result<Self> {
        let config = SupervisorConfig::from_store(&store)?;
        Self::with_config(store, config)
    }

    /// Create a supervisor with explicit settings. Identity, calibration and
    /// the last motor position are still loaded from `store`.
    pub fn with_config(store: S, config: SupervisorConfig) -> Result<Self> {
        config.validate()?;
        let mut motors = MotorStatus::new(config.range_x, config.range_y);
        let last_x = i32::try_from(store.get_int(KEY_LAST_X, 0)).unwrap_or(0);
        let last_y = i32::try_from(store.get_int(KEY_LAST_Y, 0)).unwrap_or(0);
        motors.position = MotorPosition::new(last_x, last_y, 0);

        let camera = CameraCalibration {
            port: u16::try_from(store.get_int(KEY_WEBCAM_PORT, DEFAULT_WEBCAM_PORT))
                .unwrap_or(DEFAULT_WEBCAM_PORT as u16),
            path: store.get_string(KEY_WEBCAM_PATH, DEFAULT_WEBCAM_PATH),
            offset_x: u32::try_from(store.get_int(KEY_WEBCAM_OFFSET_X, 0)).unwrap_or(0),
            offset_y: u32::try_from(store.get_int(KEY_WEBCAM_OFFSET_Y, 0)).unwrap_or(0),
            distance: u32::try_from(store.get_int(KEY_WEBCAM_DISTANCE, 0)).unwrap_or(0),
        };
        let id = store.get_string(KEY_DEVICE_ID, DEFAULT_DEVICE_ID);

        info!(
            id = %id,
            x = motors.position.x,
            y = motors.position.y,
            "supervisor initialized"
        );

        Ok(Self {
            survey: SurveyGrid::new(config.survey_bins, config.survey_coverage),
            config,
            store,
            id,
            motors_peer: PeerSlot::default(),
            accelerometer_peer: PeerSlot::default(),
            motors,
            persisted: None,
            camera,
            sfp: SfpStatus::default(),
            last_power: None,
            accelerometer: None,
            next_poll: None,
        })
    }

    /// Attach the transport that reaches `peer`, replacing any previous one.
    pub fn attach(&mut self, peer: PeerId, transport: Box<dyn SerialTransport>) {
        info!(%peer, transport = transport.name(), "attached peer link");
        self.slot_mut(peer).link = Some(PeerLink::new(transport));
    }

    /// Detach the transport for `peer`, if any.
    pub fn detach(&mut self, peer: PeerId) -> Option<PeerLink> {
        self.slot_mut(peer).link.take()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn peer_state(&self, peer: PeerId) -> &PeerState {
        &self.slot(peer).state
    }

    pub fn is_connected(&self, peer: PeerId) -> bool {
        self.slot(peer).state.is_connected()
    }

    fn slot(&self, peer: PeerId) -> &PeerSlot {
        match peer {
            PeerId::Motors => &self.motors_peer,
            PeerId::Accelerometer => &self.accelerometer_peer,
        }
    }

    fn slot_mut(&mut self, peer: PeerId) -> &mut PeerSlot {
        match peer {
            PeerId::Motors => &mut self.motors_peer,
            PeerId::Accelerometer => &mut self.accelerometer_peer,
        }
    }

    /// Run one iteration: receive, fire keepalives, send due status requests.
    pub fn poll(&mut self, now: Instant) {
        for peer in PeerId::ALL {
            for message in self.receive(peer) {
                if let Err(err) = self.handle_message(peer, &message, now) {
                    warn!(%peer, error = %err, "failed to handle message");
                }
            }
        }

        for peer in PeerId::ALL {
            if self.slot_mut(peer).state.expire(now) {
                warn!(%peer, "peer disconnected (keepalive expired)");
            }
        }

        let due = self.next_poll.is_none_or(|deadline| now >= deadline);
        if due {
            self.request_status(now);
            self.next_poll = Some(now + self.config.poll_interval);
        }
    }

    fn receive(&mut self, peer: PeerId) -> Vec<Message> {
        let Some(link) = self.slot_mut(peer).link.as_mut() else {
            return Vec::new();
        };
        match link.receive() {
            Ok(messages) => {
                link.note_failure(false);
                messages
            }
            Err(err) => {
                if link.note_failure(true) {
                    warn!(%peer, error = %err, "receive failed");
                } else {
                    debug!(%peer, error = %err, "receive failed");
                }
                Vec::new()
            }
        }
    }

    fn request_status(&mut self, now: Instant) {
        let mut request = Message::command(Command::GetStatus);
        if let Some(power) = self.last_power {
            request.add_power_reading(power);
        }

        let deadline = now + self.config.keepalive_timeout;
        for peer in PeerId::ALL {
            let slot = self.slot_mut(peer);
            let Some(link) = slot.link.as_mut() else {
                continue;
            };
            slot.state.arm_keepalive(deadline);
            match link.send(&request) {
                Ok(()) => {
                    link.note_failure(false);
                }
                Err(err) => {
                    if link.note_failure(true) {
                        warn!(%peer, error = %err, "status request failed");
                    }
                }
            }
        }
    }

    /// Dispatch one verified message received from `peer`.
    pub fn handle_message(&mut self, peer: PeerId, message: &Message, now: Instant) -> Result<()> {
        if let Some(reply) = message.reply_code() {
            if self.slot_mut(peer).state.mark_seen(now) {
                info!(%peer, "peer connected");
            }
            match reply {
                Reply::StatusReport => self.apply_status(peer, message),
                Reply::ErrorReport => {
                    let code = message.error_report();
                    if peer == PeerId::Motors {
                        self.motors.last_error = code;
                    }
                    warn!(%peer, code = ?code, "peer reported an error");
                }
                Reply::Unknown(code) => debug!(%peer, code, "ignoring unknown reply"),
            }
            return Ok(());
        }

        match message.command_code() {
            Some(Command::RestoreMotor) if peer == PeerId::Motors => self.restore_motor(),
            Some(command) => {
                debug!(%peer, command = command.name(), "ignoring command from peer");
                Ok(())
            }
            None => {
                debug!(%peer, %message, "ignoring message without command or reply");
                Ok(())
            }
        }
    }

    fn restore_motor(&mut self) -> Result<()> {
        let position = self.motors.position;
        info!(
            x = position.x,
            y = position.y,
            z = position.z,
            "restoring motor position"
        );
        let mut reply = Message::command(Command::MoveMotor);
        reply.add_motor_position(&position);
        self.send(PeerId::Motors, &reply)
    }

    /// Apply a status report. Only reports from MOTORS carry motor and power
    /// fields; the accelerometer contributes its sample and nothing else.
    ///
    /// Reports arrive through [`handle_message`](Self::handle_message), which
    /// has already marked the peer connected, so every MOTORS report with a
    /// position feeds the survey.
    fn apply_status(&mut self, peer: PeerId, message: &Message) {
        if let Some(sample) = message.accelerometer_value() {
            self.accelerometer = Some(sample);
        }
        if peer != PeerId::Motors {
            return;
        }

        if let Some(encoder) = message.encoder_value() {
            self.motors.encoder = encoder;
        }
        if let Some(current) = message.current_reading() {
            self.motors.current = Some(current);
        }
        if let Some(code) = message.error_report() {
            self.motors.last_error = Some(code);
        }
        if let Some(raw) = message.power_reading() {
            self.last_power = Some(raw);
        }
        if let Some(mw) = message.power_reading_mw() {
            self.sfp.rx_power_mw = mw;
        }

        let Some(position) = message.motor_position() else {
            return;
        };
        self.motors.position = position;

        if self.motors.in_range(&position) {
            self.persist_position(&position);
        } else {
            warn!(
                x = position.x,
                y = position.y,
                range_x = self.motors.range_x,
                range_y = self.motors.range_y,
                "motor position out of range, not persisting"
            );
        }

        let (bx, by) = self
            .survey
            .update(position.x, position.y, self.sfp.rx_power_mw);
        debug!(bx, by, rx_power_mw = self.sfp.rx_power_mw, "survey updated");
    }

    fn persist_position(&mut self, position: &MotorPosition) {
        let xy = (position.x, position.y);
        if self.persisted == Some(xy) {
            return;
        }
        self.store.set_int(KEY_LAST_X, i64::from(position.x));
        self.store.set_int(KEY_LAST_Y, i64::from(position.y));
        match self.store.commit() {
            Ok(()) => self.persisted = Some(xy),
            Err(err) => error!(error = %err, "failed to persist motor position"),
        }
    }

    fn send(&mut self, peer: PeerId, message: &Message) -> Result<()> {
        let link = self
            .slot_mut(peer)
            .link
            .as_mut()
            .ok_or(SupervisorError::NotAttached(peer))?;
        link.send(message)
    }

    fn send_command(&mut self, message: &Message) -> Result<()> {
        if !self.is_connected(PeerId::Motors) {
            return Err(SupervisorError::Disconnected(PeerId::Motors));
        }
        self.send(PeerId::Motors, message)
    }

    /// Ask the controller to move the motors to an absolute position.
    pub fn move_motor(&mut self, x: i32, y: i32, z: i32) -> Result<()> {
        let mut message = Message::command(Command::MoveMotor);
        message.add_motor_position(&MotorPosition::new(x, y, z));
        self.send_command(&message)?;
        info!(x, y, z, "requested motor move");
        Ok(())
    }

    pub fn homing(&mut self) -> Result<()> {
        self.send_command(&Message::command(Command::Homing))?;
        info!("requested homing");
        Ok(())
    }

    pub fn reboot(&mut self) -> Result<()> {
        self.send_command(&Message::command(Command::Reboot))?;
        info!("requested controller reboot");
        Ok(())
    }

    /// Put the controller into its bootloader. Flashing is left to an
    /// external tool.
    pub fn firmware_upgrade(&mut self) -> Result<()> {
        self.send_command(&Message::command(Command::FirmwareUpgrade))?;
        info!("requested firmware upgrade mode");
        Ok(())
    }

    /// Store the camera crosshair offset.
    pub fn set_webcam_calibration(&mut self, offset_x: u32, offset_y: u32) -> Result<()> {
        self.camera.offset_x = offset_x;
        self.camera.offset_y = offset_y;
        self.store.set_int(KEY_WEBCAM_OFFSET_X, i64::from(offset_x));
        self.store.set_int(KEY_WEBCAM_OFFSET_Y, i64::from(offset_y));
        self.store.commit()?;
        Ok(())
    }

    /// Store the distance to the remote unit.
    pub fn set_distance(&mut self, distance: u32) -> Result<()> {
        self.camera.distance = distance;
        self.store.set_int(KEY_WEBCAM_DISTANCE, i64::from(distance));
        self.store.commit()?;
        Ok(())
    }

    pub fn reset_survey(&mut self) {
        self.survey.reset();
        info!("survey reset");
    }

    /// Accept fresh transceiver readings. The receive power is forwarded to
    /// the controller with the next status request.
    pub fn update_sfp(&mut self, sfp: SfpStatus) {
        self.last_power = Some(sfp.rx_power_raw());
        self.sfp = sfp;
    }

    pub fn survey(&self) -> SurveySnapshot {
        self.survey.snapshot()
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            id: self.id.clone(),
            connected: self.is_connected(PeerId::Motors),
            peers: PeerId::ALL
                .iter()
                .map(|&peer| PeerStatus {
                    peer,
                    attached: self.slot(peer).link.is_some(),
                    connected: self.is_connected(peer),
                })
                .collect(),
            motors: self.motors.clone(),
            accelerometer: self.accelerometer,
            camera: self.camera.clone(),
            sfp: self.sfp,
        }
    }
}
