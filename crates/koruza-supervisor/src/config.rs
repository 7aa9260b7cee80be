//! Key/value configuration stores and the supervisor settings read from them.
//!
//! Keys are flat dotted paths such as `motors.last_x`. Lookups never fail:
//! a missing or mistyped value yields the caller's default. Only
//! [`ConfigStore::commit`] touches durable storage.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::survey::{DEFAULT_BINS, DEFAULT_COVERAGE, MAX_BINS};

pub const KEY_POLL_INTERVAL_MS: &str = "supervisor.poll_interval_ms";
pub const KEY_KEEPALIVE_TIMEOUT_MS: &str = "supervisor.keepalive_timeout_ms";
pub const KEY_RANGE_X: &str = "motors.range_x";
pub const KEY_RANGE_Y: &str = "motors.range_y";
pub const KEY_LAST_X: &str = "motors.last_x";
pub const KEY_LAST_Y: &str = "motors.last_y";
pub const KEY_SURVEY_BINS: &str = "survey.bins";
pub const KEY_SURVEY_COVERAGE: &str = "survey.coverage";
pub const KEY_DEVICE_ID: &str = "device.id";
pub const KEY_WEBCAM_PORT: &str = "webcam.port";
pub const KEY_WEBCAM_PATH: &str = "webcam.path";
pub const KEY_WEBCAM_OFFSET_X: &str = "webcam.offset_x";
pub const KEY_WEBCAM_OFFSET_Y: &str = "webcam.offset_y";
pub const KEY_WEBCAM_DISTANCE: &str = "webcam.distance";

pub const DEFAULT_POLL_INTERVAL_MS: i64 = 1000;
pub const DEFAULT_KEEPALIVE_TIMEOUT_MS: i64 = 500;
pub const DEFAULT_MOTOR_RANGE: i64 = 25_000;

/// Persistent key/value store.
pub trait ConfigStore {
    fn get_string(&self, path: &str, default: &str) -> String;
    fn get_int(&self, path: &str, default: i64) -> i64;
    fn set_string(&mut self, path: &str, value: &str);
    fn set_int(&mut self, path: &str, value: i64);
    /// Make all pending changes durable.
    fn commit(&mut self) -> Result<(), ConfigError>;
}

fn value_as_string(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn value_as_int(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// In-memory store. Commits succeed without side effects unless told to
/// fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: BTreeMap<String, Value>,
    commits: u64,
    fail_commits: bool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn set_fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_string(&self, path: &str, default: &str) -> String {
        value_as_string(self.values.get(path), default)
    }

    fn get_int(&self, path: &str, default: i64) -> i64 {
        value_as_int(self.values.get(path), default)
    }

    fn set_string(&mut self, path: &str, value: &str) {
        self.values
            .insert(path.to_string(), Value::String(value.to_string()));
    }

    fn set_int(&mut self, path: &str, value: i64) {
        self.values.insert(path.to_string(), Value::from(value));
    }

    fn commit(&mut self) -> Result<(), ConfigError> {
        if self.fail_commits {
            return Err(ConfigError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("simulated commit failure"),
            });
        }
        self.commits += 1;
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk.
///
/// Changes stay in memory until [`ConfigStore::commit`], which replaces the
/// file atomically (temporary file in the same directory, then rename).
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
    dirty: bool,
}

impl JsonConfigStore {
    /// Load `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| ConfigError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration file missing, using defaults");
                BTreeMap::new()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn get_string(&self, path: &str, default: &str) -> String {
        value_as_string(self.values.get(path), default)
    }

    fn get_int(&self, path: &str, default: i64) -> i64 {
        value_as_int(self.values.get(path), default)
    }

    fn set_string(&mut self, path: &str, value: &str) {
        self.values
            .insert(path.to_string(), Value::String(value.to_string()));
        self.dirty = true;
    }

    fn set_int(&mut self, path: &str, value: i64) {
        self.values.insert(path.to_string(), Value::from(value));
        self.dirty = true;
    }

    fn commit(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut encoded =
            serde_json::to_vec_pretty(&self.values).map_err(|source| ConfigError::Json {
                path: self.path.clone(),
                source,
            })?;
        encoded.push(b'\n');

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&encoded).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        self.dirty = false;
        debug!(path = %self.path.display(), "configuration committed");
        Ok(())
    }
}

/// Supervisor timing, travel limits and survey geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub keepalive_timeout: Duration,
    pub range_x: u32,
    pub range_y: u32,
    pub survey_bins: usize,
    pub survey_coverage: i64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS as u64),
            keepalive_timeout: Duration::from_millis(DEFAULT_KEEPALIVE_TIMEOUT_MS as u64),
            range_x: DEFAULT_MOTOR_RANGE as u32,
            range_y: DEFAULT_MOTOR_RANGE as u32,
            survey_bins: DEFAULT_BINS,
            survey_coverage: DEFAULT_COVERAGE,
        }
    }
}

impl SupervisorConfig {
    /// Read settings from `store`, falling back to defaults for absent keys.
    pub fn from_store<S: ConfigStore + ?Sized>(store: &S) -> Result<Self, ConfigError> {
        let poll_ms = positive(
            KEY_POLL_INTERVAL_MS,
            store.get_int(KEY_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS),
        )?;
        let keepalive_ms = positive(
            KEY_KEEPALIVE_TIMEOUT_MS,
            store.get_int(KEY_KEEPALIVE_TIMEOUT_MS, DEFAULT_KEEPALIVE_TIMEOUT_MS),
        )?;

        let config = Self {
            poll_interval: Duration::from_millis(poll_ms),
            keepalive_timeout: Duration::from_millis(keepalive_ms),
            range_x: range(KEY_RANGE_X, store.get_int(KEY_RANGE_X, DEFAULT_MOTOR_RANGE))?,
            range_y: range(KEY_RANGE_Y, store.get_int(KEY_RANGE_Y, DEFAULT_MOTOR_RANGE))?,
            survey_bins: usize::try_from(positive(
                KEY_SURVEY_BINS,
                store.get_int(KEY_SURVEY_BINS, DEFAULT_BINS as i64),
            )?)
            .unwrap_or(usize::MAX),
            survey_coverage: positive(
                KEY_SURVEY_COVERAGE,
                store.get_int(KEY_SURVEY_COVERAGE, DEFAULT_COVERAGE),
            )? as i64,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints the supervisor relies on.
    ///
    /// The keepalive must fire before the next status request re-arms it,
    /// otherwise a silent peer is never marked disconnected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(invalid(KEY_POLL_INTERVAL_MS, "must be greater than zero"));
        }
        if self.keepalive_timeout.is_zero() {
            return Err(invalid(KEY_KEEPALIVE_TIMEOUT_MS, "must be greater than zero"));
        }
        if self.keepalive_timeout >= self.poll_interval {
            return Err(invalid(
                KEY_KEEPALIVE_TIMEOUT_MS,
                format!(
                    "must be shorter than the poll interval ({} ms)",
                    self.poll_interval.as_millis()
                ),
            ));
        }
        if !(1..=MAX_BINS).contains(&self.survey_bins) {
            return Err(invalid(
                KEY_SURVEY_BINS,
                format!("expected 1..={MAX_BINS}, got {}", self.survey_bins),
            ));
        }
        if self.survey_coverage <= 0 {
            return Err(invalid(
                KEY_SURVEY_COVERAGE,
                format!("expected a positive integer, got {}", self.survey_coverage),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.into(),
    }
}

fn positive(key: &str, value: i64) -> Result<u64, ConfigError> {
    if value <= 0 {
        return Err(invalid(key, format!("expected a positive integer, got {value}")));
    }
    Ok(value as u64)
}

fn range(key: &str, value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("expected 0..={}, got {value}", u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_and_overrides() {
        let mut store = MemoryConfigStore::new();
        assert_eq!(store.get_int(KEY_LAST_X, -7), -7);
        assert_eq!(store.get_string(KEY_DEVICE_ID, "unknown"), "unknown");

        store.set_int(KEY_LAST_X, 42);
        store.set_string(KEY_DEVICE_ID, "koruza-1");
        assert_eq!(store.get_int(KEY_LAST_X, 0), 42);
        assert_eq!(store.get_string(KEY_LAST_X, ""), "42");
        assert_eq!(store.get_string(KEY_DEVICE_ID, ""), "koruza-1");
        assert_eq!(store.commits(), 0);
    }

    #[test]
    fn numeric_strings_are_accepted_as_ints() {
        let mut store = MemoryConfigStore::new();
        store.set_string(KEY_RANGE_X, " 1200 ");
        store.set_string(KEY_RANGE_Y, "wide");
        assert_eq!(store.get_int(KEY_RANGE_X, 0), 1200);
        assert_eq!(store.get_int(KEY_RANGE_Y, 5), 5);
    }

    #[test]
    fn memory_commit_failure() {
        let mut store = MemoryConfigStore::new();
        store.set_fail_commits(true);
        assert!(matches!(store.commit(), Err(ConfigError::Io { .. })));
        assert_eq!(store.commits(), 0);
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::open(dir.path().join("koruza.json")).unwrap();
        assert_eq!(store.get_int(KEY_LAST_Y, 3), 3);
    }

    #[test]
    fn json_store_commit_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("koruza.json");

        let mut store = JsonConfigStore::open(&path).unwrap();
        store.set_int(KEY_LAST_X, -18004);
        store.set_string(KEY_DEVICE_ID, "unit-a");
        assert!(!path.exists());
        store.commit().unwrap();

        let reopened = JsonConfigStore::open(&path).unwrap();
        assert_eq!(reopened.get_int(KEY_LAST_X, 0), -18004);
        assert_eq!(reopened.get_string(KEY_DEVICE_ID, ""), "unit-a");

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["motors.last_x"], -18004);
    }

    #[test]
    fn json_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            JsonConfigStore::open(&path),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn supervisor_config_defaults() {
        let config = SupervisorConfig::from_store(&MemoryConfigStore::new()).unwrap();
        assert_eq!(config, SupervisorConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.keepalive_timeout, Duration::from_millis(500));
    }

    #[test]
    fn keepalive_must_be_shorter_than_poll() {
        let mut store = MemoryConfigStore::new();
        store.set_int(KEY_POLL_INTERVAL_MS, 400);
        let err = SupervisorConfig::from_store(&store).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == KEY_KEEPALIVE_TIMEOUT_MS)
        );
    }

    #[test]
    fn oversized_survey_is_rejected() {
        let mut store = MemoryConfigStore::new();
        store.set_int(KEY_SURVEY_BINS, 1 << 33);
        let err = SupervisorConfig::from_store(&store).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == KEY_SURVEY_BINS));

        store.set_int(KEY_SURVEY_BINS, MAX_BINS as i64);
        assert_eq!(
            SupervisorConfig::from_store(&store).unwrap().survey_bins,
            MAX_BINS
        );
    }

    #[test]
    fn validate_rejects_keepalive_longer_than_poll() {
        let config = SupervisorConfig {
            poll_interval: Duration::from_millis(1000),
            keepalive_timeout: Duration::from_millis(1500),
            ..SupervisorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == KEY_KEEPALIVE_TIMEOUT_MS)
        );
        assert!(SupervisorConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_range_is_rejected() {
        let mut store = MemoryConfigStore::new();
        store.set_int(KEY_RANGE_Y, -1);
        assert!(SupervisorConfig::from_store(&store).is_err());
    }
}
