use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Prefix shared by the targets of every crate in this workspace.
const KORUZA_TARGET: &str = "koruza";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` applies to this workspace; other targets are capped at WARN.
fn targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_target(KORUZA_TARGET, level)
        .with_default(level.min(LevelFilter::WARN))
}

/// Install the global subscriber on stderr so stdout stays machine-readable.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let registry = tracing_subscriber::registry().with(targets(level));

    match format {
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false);
            let _ = registry.with(layer).try_init();
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            let _ = registry.with(layer).try_init();
        }
    }
}
