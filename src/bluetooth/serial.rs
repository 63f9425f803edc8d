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

//! Serial transport used by the Bluetooth manager.

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Line-oriented serial link to the cane.
pub trait SerialTransport: Send {
    /// Start advertising under `name`.
    fn begin(&mut self, name: &str) -> Result<()>;

    /// Whether a client is currently connected.
    fn has_client(&self) -> bool;

    /// Write one line to the connected client.
    fn println(&mut self, line: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct SerialState {
    client_connected: bool,
    advertised: Vec<String>,
    sent: Vec<String>,
}

/// In-process stand-in for the cane's Bluetooth serial port.
///
/// Clones share the same state, so one handle can be given to the manager
/// while another drives the connection and inspects the traffic.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSerial {
    state: Arc<Mutex<SerialState>>,
}

impl SimulatedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_client_connected(&self, connected: bool) {
        self.state.lock().client_connected = connected;
    }

    /// Names passed to `begin`, in order.
    pub fn advertised_names(&self) -> Vec<String> {
        self.state.lock().advertised.clone()
    }

    /// Lines written with `println`, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }
}

impl SerialTransport for SimulatedSerial {
    fn begin(&mut self, name: &str) -> Result<()> {
        self.state.lock().advertised.push(name.to_string());
        Ok(())
    }

    fn has_client(&self) -> bool {
        self.state.lock().client_connected
    }

    fn println(&mut self, line: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.client_connected {
            bail!("No client connected");
        }
        debug!("Serial out: {}", line);
        state.sent.push(line.to_string());
        Ok(())
    }
}
