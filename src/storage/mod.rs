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

//! Storage module.

mod contact;
mod history;
mod led;
mod settings;

pub use contact::{load_contact, save_contact, EmergencyContact, CONTACT_KEY};
pub use history::{EventHistory, EventKind, HistoryEntry};
pub use led::{load_led, save_led, LED_KEY};
pub use settings::SettingsStore;
