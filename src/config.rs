// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::DEFAULT_DEVICE_NAME;
use crate::emergency::{DispatchPolicy, TriggerSettings};
use crate::status::TelemetrySettings;

const APP_DIR: &str = "smartcane";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for settings and history.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Cane link and telemetry settings.
    pub device: DeviceConfig,

    /// Feedback the cane gives when it detects an obstacle.
    pub alerts: AlertConfig,

    /// Emergency button settings.
    pub emergency: EmergencyConfig,

    /// History settings.
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name the cane advertises over Bluetooth.
    pub name: String,

    /// Milliseconds between telemetry updates.
    pub status_interval_ms: u64,

    /// Largest battery drop per update, in percent.
    pub max_battery_drain: f64,

    /// Simulated scan duration in milliseconds.
    pub scan_delay_ms: u64,

    /// Milliseconds between demo detections.
    pub feed_interval_ms: u64,

    /// LED state on first run, before it is toggled.
    pub led_on: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            status_interval_ms: 3000,
            max_battery_drain: 0.5,
            scan_delay_ms: 800,
            feed_interval_ms: 1000,
            led_on: false,
        }
    }
}

impl DeviceConfig {
    pub fn telemetry(&self) -> TelemetrySettings {
        TelemetrySettings {
            interval: Duration::from_millis(self.status_interval_ms),
            max_battery_drain: self.max_battery_drain.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Vibration strength, 0-100.
    #[serde(deserialize_with = "percent")]
    pub vibration_intensity: u8,

    /// Buzzer volume, 0-100.
    #[serde(deserialize_with = "percent")]
    pub buzzer_volume: u8,
}

/// Read any integer and clamp it to 0..=100.
fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = i64::deserialize(deserializer)?;
    Ok(value.clamp(0, 100) as u8)
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            vibration_intensity: 50,
            buzzer_volume: 75,
        }
    }
}

impl AlertConfig {
    pub fn set_vibration_intensity(&mut self, value: u8) {
        self.vibration_intensity = value.min(100);
    }

    pub fn set_buzzer_volume(&mut self, value: u8) {
        self.buzzer_volume = value.min(100);
    }

}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// How long the button must be held, in milliseconds.
    pub hold_duration_ms: u64,

    /// How long a placed call lasts, in milliseconds.
    pub call_duration_ms: u64,

    /// Keep notifying the remaining listeners when one fails.
    pub isolate_listener_failures: bool,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: 3000,
            call_duration_ms: 3000,
            isolate_listener_failures: true,
        }
    }
}

impl EmergencyConfig {
    pub fn trigger(&self) -> TriggerSettings {
        TriggerSettings {
            hold_duration: Duration::from_millis(self.hold_duration_ms),
            call_duration: Duration::from_millis(self.call_duration_ms),
        }
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        if self.isolate_listener_failures {
            DispatchPolicy::Isolate
        } else {
            DispatchPolicy::FailFast
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Enable event history.
    pub enabled: bool,

    /// Maximum number of history entries.
    pub max_entries: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_dir(dirs::data_dir()),
            device: DeviceConfig::default(),
            alerts: AlertConfig::default(),
            emergency: EmergencyConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

fn default_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

impl Config {
    /// Load configuration from the user config directory, creating it with
    /// defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(
            &default_dir(dirs::config_dir()),
            &default_dir(dirs::data_dir()),
        )
    }

    /// Load `config.toml` from `config_dir` and use `data_dir` for storage.
    pub fn load_from(config_dir: &Path, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir)?;

        let config_path = config_dir.join("config.toml");

        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&config_path, content)?;
            config
        };

        // Set data directory
        config.data_dir = data_dir.to_path_buf();
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(config)
    }

    /// Save configuration to `config_dir`.
    pub fn save_to(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }
}
