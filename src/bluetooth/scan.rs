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

//! Simulated device discovery.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// A cane found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaneDevice {
    /// Bluetooth address.
    pub id: String,
    pub name: String,
}

impl CaneDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Scanner that reports a fixed pair of canes after a short delay.
#[derive(Debug, Clone)]
pub struct MockScanner {
    delay: Duration,
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

impl MockScanner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn scan(&self) -> Vec<CaneDevice> {
        info!("Scanning for canes...");
        tokio::time::sleep(self.delay).await;

        let devices = vec![
            CaneDevice::new("AA:BB:CC:11:22:33", "Assistive_Cane"),
            CaneDevice::new("DD:EE:FF:44:55:66", "Cane Backup"),
        ];
        info!("Scan finished: {} canes found", devices.len());
        devices
    }

    /// Pick a device from scan results by address.
    pub fn find<'a>(devices: &'a [CaneDevice], id: &str) -> Option<&'a CaneDevice> {
        devices.iter().find(|d| d.id == id)
    }
}
