mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "koruza", version, about = "KORUZA alignment unit link daemon")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);

    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::CommandName;

    #[test]
    fn parses_encode_with_negative_position() {
        let cli = Cli::try_parse_from([
            "koruza",
            "encode",
            "move-motor",
            "--position",
            "10,-20,-15",
        ])
        .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.command, CommandName::MoveMotor);
                assert_eq!(args.position, Some(vec![10, -20, -15]));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_command_name() {
        let err = Cli::try_parse_from(["koruza", "encode", "self-destruct"])
            .expect_err("unknown command should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "koruza",
            "--log-level",
            "debug",
            "run",
            "--motors-device",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "--duration",
            "2s",
        ])
        .expect("run args should parse");
        assert!(matches!(cli.command, Command::Run(_)));
    }
}
