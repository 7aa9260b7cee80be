use std::fmt;
use std::time::Instant;

use serde::Serialize;

/// Logical peers on the far side of the serial links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeerId {
    Motors,
    Accelerometer,
}

impl PeerId {
    pub const ALL: [PeerId; 2] = [PeerId::Motors, PeerId::Accelerometer];

    pub fn name(self) -> &'static str {
        match self {
            PeerId::Motors => "motors",
            PeerId::Accelerometer => "accelerometer",
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection bookkeeping for one peer.
///
/// Starts disconnected. Any reply marks the peer connected and cancels the
/// pending keepalive; a keepalive that expires without a reply marks it
/// disconnected. Both transitions are edge-triggered.
#[derive(Debug, Clone, Default)]
pub struct PeerState {
    connected: bool,
    last_seen: Option<Instant>,
    keepalive: Option<Instant>,
    transitions: u64,
}

impl PeerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    /// Deadline of the outstanding keepalive, if one is armed.
    pub fn keepalive_deadline(&self) -> Option<Instant> {
        self.keepalive
    }

    /// Number of connect/disconnect edges seen so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Record a reply. Returns `true` when the peer just became connected.
    pub fn mark_seen(&mut self, now: Instant) -> bool {
        self.last_seen = Some(now);
        self.keepalive = None;
        if self.connected {
            return false;
        }
        self.connected = true;
        self.transitions += 1;
        true
    }

    /// Arm the keepalive deadline. A deadline that is already armed is kept,
    /// so repeated requests to a silent peer cannot postpone its expiry.
    pub fn arm_keepalive(&mut self, deadline: Instant) {
        self.keepalive.get_or_insert(deadline);
    }

    /// Fire the keepalive if its deadline has passed. Returns `true` when the
    /// peer just became disconnected.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.keepalive {
            Some(deadline) if now >= deadline => {
                self.keepalive = None;
                if !self.connected {
                    return false;
                }
                self.connected = false;
                self.transitions += 1;
                true
            }
            _ => false,
        }
    }
}
