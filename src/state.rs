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

//! Application state management.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::bluetooth::CaneDevice;
use crate::detection::{CaneSample, FieldPair, SerialField, Zone};
use crate::status::{DeviceStatus, DeviceStatusObserver};

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Scanning,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Scanning => "Scanning...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Paired cane, while connected.
    pub connected_device: RwLock<Option<CaneDevice>>,

    /// Latest telemetry broadcast.
    pub last_status: RwLock<DeviceStatus>,

    /// Latest obstacle reading.
    pub last_detection: RwLock<Option<CaneSample>>,

    /// Last `DIST,` and `ZONE,` values from the serial bridge.
    pub serial_fields: RwLock<FieldPair>,

    /// Cane LED switch.
    pub led_on: RwLock<bool>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Disconnected),
            connected_device: RwLock::new(None),
            last_status: RwLock::new(DeviceStatus::default()),
            last_detection: RwLock::new(None),
            serial_fields: RwLock::new(FieldPair::new()),
            led_on: RwLock::new(false),
        }
    }
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_scanning(&self) {
        *self.connection_status.write() = ConnectionStatus::Scanning;
    }

    pub fn set_connected(&self, device: CaneDevice) {
        *self.connection_status.write() = ConnectionStatus::Connected;
        *self.connected_device.write() = Some(device);
    }

    pub fn set_disconnected(&self) {
        *self.connection_status.write() = ConnectionStatus::Disconnected;
        *self.connected_device.write() = None;
    }

    pub fn set_error(&self) {
        *self.connection_status.write() = ConnectionStatus::Error;
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn get_device(&self) -> Option<CaneDevice> {
        self.connected_device.read().clone()
    }

    pub fn get_telemetry(&self) -> DeviceStatus {
        *self.last_status.read()
    }

    pub fn set_last_detection(&self, sample: CaneSample) {
        *self.last_detection.write() = Some(sample);
    }

    pub fn get_last_detection(&self) -> Option<CaneSample> {
        *self.last_detection.read()
    }

    /// Store one serial field. Returns a sample once distance and zone pair up.
    pub fn apply_serial_field(&self, field: SerialField) -> Option<CaneSample> {
        self.serial_fields.write().apply(field)
    }

    pub fn get_last_distance(&self) -> Option<u32> {
        self.serial_fields.read().last_distance()
    }

    pub fn get_last_zone(&self) -> Option<Zone> {
        self.serial_fields.read().last_zone()
    }

    pub fn set_led(&self, on: bool) {
        *self.led_on.write() = on;
    }

    /// Flip the LED and return the new state.
    pub fn toggle_led(&self) -> bool {
        let mut led = self.led_on.write();
        *led = !*led;
        *led
    }

    pub fn is_led_on(&self) -> bool {
        *self.led_on.read()
    }
}

impl DeviceStatusObserver for AppState {
    fn update(&self, status: &DeviceStatus) {
        *self.last_status.write() = *status;
    }
}
