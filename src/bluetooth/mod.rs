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

//! Bluetooth link to the cane.
//!
//! There is no real radio here: the serial transport and the device scan are
//! simulated in-process.

mod manager;
mod scan;
mod serial;

pub use manager::{BluetoothManager, FrameForwarder, MobileAppModule};
pub use scan::{CaneDevice, MockScanner};
pub use serial::{SerialTransport, SimulatedSerial};

/// Name the cane advertises when none is configured.
pub const DEFAULT_DEVICE_NAME: &str = "SmartCane";
