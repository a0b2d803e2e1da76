//! Configuration management for the sensor session engine
//!
//! This module provides runtime configuration loading from JSON files so
//! that the device address, retry policy and calibration timing can be
//! adjusted without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Identity of the target peripheral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Fixed peripheral address (MAC on Linux/Android/Windows, UUID on macOS)
    pub address: String,
    /// Advertised local name
    pub name: String,
    /// GATT service exposing the reading
    pub service_uuid: String,
    /// Readable characteristic carrying the value as ASCII text
    pub characteristic_uuid: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: "24:6F:28:1A:2B:3C".to_string(),
            name: "EMG-Sensor".to_string(),
            service_uuid: "19b10000-e8f2-537e-4f6c-d104768a1214".to_string(),
            characteristic_uuid: "19b10001-e8f2-537e-4f6c-d104768a1214".to_string(),
        }
    }
}

/// Connection retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Full passes over all address variants before giving up
    pub max_attempts: u32,
    /// Deadline for a single variant (connect + verify)
    pub attempt_timeout_ms: u64,
    /// Pause between passes
    pub backoff_ms: u64,
    /// Start a new bounded connect job when a live link drops
    pub reconnect_on_drop: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_ms: 10_000,
            backoff_ms: 2_000,
            reconnect_on_drop: true,
        }
    }
}

impl ConnectionConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Calibration protocol timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Length of the relax phase in seconds
    pub relax_secs: u64,
    /// Length of the tension phase in seconds
    pub tension_secs: u64,
    /// How often the gate is polled while calibrating
    pub poll_interval_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            relax_secs: 15,
            tension_secs: 15,
            poll_interval_ms: 100,
        }
    }
}

impl CalibrationConfig {
    pub fn relax_duration(&self) -> Duration {
        Duration::from_secs(self.relax_secs)
    }

    pub fn tension_duration(&self) -> Duration {
        Duration::from_secs(self.tension_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Recording session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session tick period; one tick advances elapsed time by one second
    pub tick_interval_ms: u64,
    /// Poll period for the live readout when no session or calibration runs
    pub monitor_interval_ms: u64,
    /// Directory used by the JSON session sink
    pub output_dir: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            monitor_interval_ms: 250,
            output_dir: "sessions".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms.max(1))
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/emg_config.json")
    }
}
