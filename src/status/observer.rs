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

//! Telemetry snapshot and the observer contract.

use serde::{Deserialize, Serialize};

/// Battery level at or below which the cane is reported as low.
pub const LOW_BATTERY_THRESHOLD: f64 = 20.0;

/// Simulated telemetry of the paired cane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Percentage, never below zero.
    pub battery_level: f64,
    /// Bars, 1 to 5.
    pub signal_strength: u8,
    /// Ambient reading in degrees Celsius.
    pub temperature: f64,
    pub is_connected: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            battery_level: 85.0,
            signal_strength: 4,
            temperature: 22.0,
            is_connected: false,
        }
    }
}

impl DeviceStatus {
    pub fn is_battery_low(&self) -> bool {
        self.battery_level <= LOW_BATTERY_THRESHOLD
    }
}

/// Receives every status broadcast from the device status manager.
pub trait DeviceStatusObserver: Send + Sync {
    fn update(&self, status: &DeviceStatus);
}

impl<F> DeviceStatusObserver for F
where
    F: Fn(&DeviceStatus) + Send + Sync,
{
    fn update(&self, status: &DeviceStatus) {
        self(status)
    }
}
