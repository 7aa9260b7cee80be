use std::io;

use koruza_frame::FrameError;
use koruza_supervisor::{ConfigError, SupervisorError};
use koruza_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// A serial device could not be opened or a peer link is down.
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
/// Malformed frames, payloads or configuration values.
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

/// A failed command: the message printed on stderr and the process exit code.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = if err.kind() == io::ErrorKind::PermissionDenied {
        PERMISSION_DENIED
    } else {
        INTERNAL
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::FrameTooLarge { .. } | FrameError::Message(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    match err {
        ConfigError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {source}"))
        }
        ConfigError::Io { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
        ConfigError::Json { .. } | ConfigError::Invalid { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn supervisor_error(context: &str, err: SupervisorError) -> CliError {
    match err {
        SupervisorError::Transport(err) => transport_error(context, err),
        SupervisorError::Frame(err) => frame_error(context, err),
        SupervisorError::Config(err) => config_error(context, err),
        SupervisorError::Disconnected(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        SupervisorError::NotAttached(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}
