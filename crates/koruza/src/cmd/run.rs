use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use koruza_supervisor::{ConfigStore, DeviceSupervisor, JsonConfigStore, MemoryConfigStore, PeerId};
use koruza_transport::{SerialConfig, SerialPortTransport};
use tracing::{info, warn};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{config_error, supervisor_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat};

const KEY_MOTORS_DEVICE: &str = "serial.motors_device";
const KEY_ACCELEROMETER_DEVICE: &str = "serial.accelerometer_device";
const KEY_BAUD: &str = "serial.baud";

const DEFAULT_MOTORS_DEVICE: &str = "/dev/ttyS1";
const DEFAULT_BAUD: i64 = 115_200;

const LOOP_SLEEP: Duration = Duration::from_millis(10);
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Serial device selection after applying command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkSettings {
    motors_device: PathBuf,
    accelerometer_device: Option<PathBuf>,
    baud: u32,
}

impl LinkSettings {
    fn resolve<S: ConfigStore>(store: &S, args: &RunArgs) -> CliResult<Self> {
        let motors_device = args
            .motors_device
            .clone()
            .unwrap_or_else(|| {
                PathBuf::from(store.get_string(KEY_MOTORS_DEVICE, DEFAULT_MOTORS_DEVICE))
            });

        let accelerometer_device = args.accelerometer_device.clone().or_else(|| {
            let configured = store.get_string(KEY_ACCELEROMETER_DEVICE, "");
            (!configured.is_empty()).then(|| PathBuf::from(configured))
        });

        let baud = match args.baud {
            Some(baud) => baud,
            None => {
                let raw = store.get_int(KEY_BAUD, DEFAULT_BAUD);
                u32::try_from(raw)
                    .ok()
                    .filter(|baud| *baud > 0)
                    .ok_or_else(|| {
                        CliError::new(
                            crate::exit::DATA_INVALID,
                            format!("invalid value for {KEY_BAUD}: {raw}"),
                        )
                    })?
            }
        };

        Ok(Self {
            motors_device,
            accelerometer_device,
            baud,
        })
    }

    /// The accelerometer device, unless it is the same device as the motors
    /// link.
    fn separate_accelerometer(&self) -> Option<&Path> {
        self.accelerometer_device
            .as_deref()
            .filter(|path| *path != self.motors_device.as_path())
    }
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    match args.config.clone() {
        Some(path) => {
            let store = JsonConfigStore::open(&path)
                .map_err(|err| config_error("load configuration failed", err))?;
            info!(path = %path.display(), "loaded configuration");
            supervise(store, &args, format)
        }
        None => {
            warn!("no configuration file given, motor position will not survive restarts");
            supervise(MemoryConfigStore::new(), &args, format)
        }
    }
}

fn supervise<S: ConfigStore>(store: S, args: &RunArgs, format: OutputFormat) -> CliResult<i32> {
    let stop_after = args.duration.as_deref().map(parse_duration).transpose()?;
    let links = LinkSettings::resolve(&store, args)?;

    let mut supervisor = DeviceSupervisor::new(store)
        .map_err(|err| supervisor_error("invalid configuration", err))?;

    let serial = SerialConfig {
        baud_rate: links.baud,
        read_timeout: SERIAL_READ_TIMEOUT,
    };
    let motors = SerialPortTransport::open_with_config(&links.motors_device, &serial)
        .map_err(|err| transport_error("open motors device failed", err))?;
    supervisor.attach(PeerId::Motors, Box::new(motors));

    match links.separate_accelerometer() {
        Some(path) => {
            let accelerometer = SerialPortTransport::open_with_config(path, &serial)
                .map_err(|err| transport_error("open accelerometer device failed", err))?;
            supervisor.attach(PeerId::Accelerometer, Box::new(accelerometer));
        }
        None if links.accelerometer_device.is_some() => {
            info!("accelerometer shares the motors device, replies are attributed to motors");
        }
        None => {}
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let started = Instant::now();
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        supervisor.poll(now);
        if stop_after.is_some_and(|limit| now.duration_since(started) >= limit) {
            break;
        }
        std::thread::sleep(LOOP_SLEEP);
    }

    info!("shutting down");
    print_status(&supervisor.status(), &supervisor.survey(), format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            motors_device: None,
            accelerometer_device: None,
            baud: None,
            duration: None,
        }
    }

    #[test]
    fn defaults_without_configuration() {
        let links = LinkSettings::resolve(&MemoryConfigStore::new(), &args()).unwrap();
        assert_eq!(links.motors_device, PathBuf::from(DEFAULT_MOTORS_DEVICE));
        assert_eq!(links.accelerometer_device, None);
        assert_eq!(links.baud, 115_200);
    }

    #[test]
    fn command_line_overrides_store() {
        let mut store = MemoryConfigStore::new();
        store.set_string(KEY_MOTORS_DEVICE, "/dev/ttyUSB0");
        store.set_int(KEY_BAUD, 9600);

        let mut a = args();
        a.motors_device = Some(PathBuf::from("/dev/ttyACM0"));
        let links = LinkSettings::resolve(&store, &a).unwrap();
        assert_eq!(links.motors_device, PathBuf::from("/dev/ttyACM0"));
        assert_eq!(links.baud, 9600);
    }

    #[test]
    fn shared_device_disables_accelerometer_link() {
        let mut store = MemoryConfigStore::new();
        store.set_string(KEY_MOTORS_DEVICE, "/dev/ttyS1");
        store.set_string(KEY_ACCELEROMETER_DEVICE, "/dev/ttyS1");
        let links = LinkSettings::resolve(&store, &args()).unwrap();
        assert!(links.accelerometer_device.is_some());
        assert!(links.separate_accelerometer().is_none());

        store.set_string(KEY_ACCELEROMETER_DEVICE, "/dev/ttyS2");
        let links = LinkSettings::resolve(&store, &args()).unwrap();
        assert_eq!(links.separate_accelerometer(), Some(Path::new("/dev/ttyS2")));
    }

    #[test]
    fn invalid_baud_is_rejected() {
        let mut store = MemoryConfigStore::new();
        store.set_int(KEY_BAUD, -5);
        let err = LinkSettings::resolve(&store, &args()).unwrap_err();
        assert_eq!(err.code, crate::exit::DATA_INVALID);
    }
}
