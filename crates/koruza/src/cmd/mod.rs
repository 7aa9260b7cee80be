use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use koruza_message::Command as WireCommand;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Supervise the alignment unit until interrupted.
    Run(RunArgs),
    /// Build a command message and print its frame.
    Encode(EncodeArgs),
    /// Decode frames from hex-encoded bytes.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON configuration file; created on first commit if missing.
    #[arg(long, value_name = "FILE", env = "KORUZA_CONFIG")]
    pub config: Option<PathBuf>,
    /// Motor controller serial device (overrides serial.motors_device).
    #[arg(long, value_name = "DEVICE")]
    pub motors_device: Option<PathBuf>,
    /// Accelerometer serial device (overrides serial.accelerometer_device).
    #[arg(long, value_name = "DEVICE")]
    pub accelerometer_device: Option<PathBuf>,
    /// Line speed (overrides serial.baud).
    #[arg(long)]
    pub baud: Option<u32>,
    /// Stop after this long (e.g. 30s, 500ms) instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration: Option<String>,
}

/// Commands a gateway can send to the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CommandName {
    GetStatus,
    MoveMotor,
    Homing,
    Reboot,
    FirmwareUpgrade,
    RestoreMotor,
}

impl From<CommandName> for WireCommand {
    fn from(name: CommandName) -> Self {
        match name {
            CommandName::GetStatus => WireCommand::GetStatus,
            CommandName::MoveMotor => WireCommand::MoveMotor,
            CommandName::Homing => WireCommand::Homing,
            CommandName::Reboot => WireCommand::Reboot,
            CommandName::FirmwareUpgrade => WireCommand::FirmwareUpgrade,
            CommandName::RestoreMotor => WireCommand::RestoreMotor,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command to encode.
    pub command: CommandName,
    /// Motor position as X,Y,Z (required for move-motor).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub position: Option<Vec<i32>>,
    /// Raw power reading in 1/10000 mW.
    #[arg(long)]
    pub power: Option<u16>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded bytes (whitespace allowed). Reads stdin when omitted.
    pub hex: Option<String>,
    /// Treat input as a bare message payload instead of framed bytes.
    #[arg(long)]
    pub payload: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    use crate::exit::{CliError, USAGE};
    use std::time::Duration;

    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
