use std::path::PathBuf;

use crate::peer::PeerId;

/// Errors that can occur in supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] koruza_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] koruza_frame::FrameError),

    /// The peer has not replied since its last status request.
    #[error("peer disconnected: {0}")]
    Disconnected(PeerId),

    /// No transport is attached for the peer.
    #[error("no link attached for peer {0}")]
    NotAttached(PeerId),

    /// Configuration could not be read or persisted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by configuration stores.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
