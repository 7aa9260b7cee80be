use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

const READ_CHUNK_SIZE: usize = 1024;

/// Serial line settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed in baud.
    pub baud_rate: u32,
    /// How long a read may wait for data before reporting would-block.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(10),
        }
    }
}

/// Serial device transport (8N1, no flow control).
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
    path: PathBuf,
    name: String,
}

impl SerialPortTransport {
    /// Open a serial device with default line settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &SerialConfig::default())
    }

    /// Open a serial device with explicit line settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();

        let port = serialport::new(name.as_str(), config.baud_rate)
            .timeout(config.read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|err| TransportError::Open {
                path: path.clone(),
                message: err.to_string(),
            })?;

        if let Err(err) = port.clear(serialport::ClearBuffer::Input) {
            debug!(?path, error = %err, "could not discard stale input");
        }

        info!(?path, baud = config.baud_rate, "opened serial device");

        Ok(Self { port, path, name })
    }

    /// The device path this transport was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SerialTransport for SerialPortTransport {
    fn read(&mut self) -> Result<Option<Bytes>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&chunk[..n]))),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_fails() {
        let path = format!("/dev/koruza-missing-{}", std::process::id());
        let err = SerialPortTransport::open(&path).unwrap_err();
        match err {
            TransportError::Open { path: failed, .. } => assert_eq!(failed, PathBuf::from(path)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_config_is_fast_polling() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert!(cfg.read_timeout <= Duration::from_millis(50));
    }
}
