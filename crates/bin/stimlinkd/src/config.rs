//! Configuration loading from a TOML file plus environment variable overrides.
//!
//! Looks for `stimlink.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use serde::Deserialize;

use stimlink_adapter_ble::BleConfig;
use stimlink_adapter_virtual::VirtualOptions;
use stimlink_app::settings::SessionSettings;
use stimlink_domain::edit::PendingEdit;
use stimlink_domain::error::ValidationError;
use stimlink_domain::protocol::{ELECTRODE_COUNT, TARGET_NAME};

const CONFIG_FILE: &str = "stimlink.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub transport: TransportConfig,
    pub scan: ScanConfig,
    pub session: SessionConfig,
    /// Stimulation pattern pushed once the device reported its own.
    pub apply: Option<ApplyConfig>,
    pub ble: BleConfig,
    #[serde(rename = "virtual")]
    pub virtual_device: VirtualOptions,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Which radio to talk through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Ble,
    /// Simulated stimulator, no hardware needed.
    Virtual,
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ble" => Ok(Self::Ble),
            "virtual" => Ok(Self::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown transport `{other}`, expected `ble` or `virtual`"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
}

/// Discovery of the stimulator to connect to.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// How long to listen for advertisements.
    pub duration_secs: u64,
    /// Advertised name a peripheral must carry to be picked.
    pub target_name: String,
    /// Connect to this peripheral directly and skip the scan.
    pub device_id: Option<String>,
}

/// Session timings, in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub connect_timeout_ms: u64,
    pub discovery_backoff_ms: u64,
    pub discovery_max_attempts: u32,
    pub write_timeout_ms: u64,
    pub disconnect_timeout_ms: u64,
    pub signal_poll_interval_ms: u64,
}

/// Pattern to send after the first sync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Per-electrode current in mA, electrodes A to H.
    pub currents: [i16; ELECTRODE_COUNT],
    pub pulse_count: u16,
    pub pulse_width_us: u16,
    /// Recycle duration as a multiple of the pulse width.
    pub recycle_ratio: u8,
}

impl Config {
    /// Load configuration from `stimlink.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("STIMLINK_TRANSPORT") {
            self.transport.kind = val.parse()?;
        }
        if let Some(val) = var("STIMLINK_DEVICE_ID") {
            self.scan.device_id = Some(val).filter(|id| !id.is_empty());
        }
        if let Some(secs) = var("STIMLINK_SCAN_SECS").and_then(|val| val.parse().ok()) {
            self.scan.duration_secs = secs;
        }
        if let Some(val) = var("STIMLINK_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.duration_secs == 0 && self.scan.device_id.is_none() {
            return Err(ConfigError::Validation(
                "scan duration must be non-zero".to_string(),
            ));
        }
        if self.session.discovery_max_attempts == 0 {
            return Err(ConfigError::Validation(
                "discovery_max_attempts must be non-zero".to_string(),
            ));
        }
        if self.session.signal_poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "signal_poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if let Some(apply) = &self.apply {
            apply
                .to_edit()
                .map_err(|err| ConfigError::Validation(format!("[apply]: {err}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan.duration_secs)
    }
}

impl SessionConfig {
    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            discovery_backoff: Duration::from_millis(self.discovery_backoff_ms),
            discovery_max_attempts: self.discovery_max_attempts,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            disconnect_timeout: Duration::from_millis(self.disconnect_timeout_ms),
            signal_poll_interval: Duration::from_millis(self.signal_poll_interval_ms),
        }
    }
}

impl ApplyConfig {
    /// Draft the edit this pattern describes.
    ///
    /// # Errors
    ///
    /// Returns the first field the edit rejects.
    pub fn to_edit(&self) -> Result<PendingEdit, ValidationError> {
        let mut edit = PendingEdit::default();
        edit.set_allow_zero_pulse(self.pulse_count == 0);
        for (electrode, value) in self.currents.iter().enumerate() {
            edit.set_current(electrode, *value)?;
        }
        edit.set_pulse_count(self.pulse_count)?;
        edit.set_pulse_width_text(&self.pulse_width_us.to_string())?;
        edit.set_recycle_ratio(self.recycle_ratio)?;
        Ok(edit)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "stimlinkd=info,stimlink_app=info,stimlink_adapter_ble=info".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            duration_secs: 5,
            target_name: TARGET_NAME.to_string(),
            device_id: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let defaults = SessionSettings::default();
        Self {
            connect_timeout_ms: millis(defaults.connect_timeout),
            discovery_backoff_ms: millis(defaults.discovery_backoff),
            discovery_max_attempts: defaults.discovery_max_attempts,
            write_timeout_ms: millis(defaults.write_timeout),
            disconnect_timeout_ms: millis(defaults.disconnect_timeout),
            signal_poll_interval_ms: millis(defaults.signal_poll_interval),
        }
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            currents: [0; ELECTRODE_COUNT],
            pulse_count: 1,
            pulse_width_us: 50,
            recycle_ratio: 4,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
