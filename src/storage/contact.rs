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

//! Emergency contact persisted in the settings store.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::settings::SettingsStore;

/// Settings key holding the contact as JSON.
pub const CONTACT_KEY: &str = "emergency_contact";

/// Person called when an emergency is triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone_number: String,
}

impl EmergencyContact {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }
}

/// Read the stored contact. Missing or unreadable data yields `None`.
pub fn load_contact(store: &SettingsStore) -> Option<EmergencyContact> {
    let stored = store.get(CONTACT_KEY).filter(|s| !s.is_empty())?;
    match serde_json::from_str(stored) {
        Ok(contact) => Some(contact),
        Err(e) => {
            error!("Failed to parse emergency contact from storage: {}", e);
            None
        }
    }
}

/// Store `contact`, or remove the stored one when `None`.
pub fn save_contact(store: &mut SettingsStore, contact: Option<&EmergencyContact>) -> Result<()> {
    match contact {
        Some(contact) => {
            store.set(CONTACT_KEY, serde_json::to_string(contact)?)?;
            info!("Emergency contact set to {}", contact.name);
        }
        None => {
            store.remove(CONTACT_KEY)?;
            info!("Emergency contact cleared");
        }
    }
    Ok(())
}
