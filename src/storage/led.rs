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


//! Cane LED switch persisted in the settings store.

use anyhow::Result;
use tracing::{error, info};

use super::settings::SettingsStore;

/// Settings key holding the LED state.
pub const LED_KEY: &str = "led_on";

/// Read the stored LED state. Missing or unreadable data yields `None`.
pub fn load_led(store: &SettingsStore) -> Option<bool> {
    let stored = store.get(LED_KEY)?;
    match stored.parse() {
        Ok(on) => Some(on),
        Err(e) => {
            error!("Failed to parse LED state {:?}: {}", stored, e);
            None
        }
    }
}

pub fn save_led(store: &mut SettingsStore, on: bool) -> Result<()> {
    store.set(LED_KEY, on.to_string())?;
    info!("LED is {}", if on { "ON" } else { "OFF" });
    Ok(())
}
