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

//! Bluetooth manager: a subject that publishes every line sent to the cane.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::serial::SerialTransport;
use crate::events::CaneEvent;
use crate::subject::{Observer, Subject};

/// Owns the serial link and notifies observers of outgoing data.
pub struct BluetoothManager<S: SerialTransport> {
    transport: Mutex<S>,
    device_name: String,
    subject: Subject<String>,
}

impl<S: SerialTransport> BluetoothManager<S> {
    pub fn new(transport: S, device_name: impl Into<String>) -> Self {
        Self {
            transport: Mutex::new(transport),
            device_name: device_name.into(),
            subject: Subject::new(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn attach(&self, observer: Arc<dyn Observer<String>>) {
        self.subject.attach(observer);
    }

    /// Start the serial server under the configured name.
    pub fn begin(&self) -> Result<()> {
        self.transport.lock().begin(&self.device_name)?;
        info!("Bluetooth Server started. Waiting for connection...");
        Ok(())
    }

    /// Send a line to the connected client and notify observers.
    ///
    /// Returns `Ok(false)` without notifying anyone when no client is
    /// connected.
    pub fn send_data(&self, message: &str) -> Result<bool> {
        {
            let mut transport = self.transport.lock();
            if !transport.has_client() {
                return Ok(false);
            }
            transport.println(message)?;
        }

        self.subject.notify(&message.to_string());
        Ok(true)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.lock().has_client()
    }
}

/// Observer standing in for the phone app: logs every message it gets.
#[derive(Debug, Default)]
pub struct MobileAppModule {
    received: AtomicUsize,
}

impl MobileAppModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received_count(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }
}

impl Observer<String> for MobileAppModule {
    fn update(&self, message: &String) {
        self.received.fetch_add(1, Ordering::Relaxed);
        info!("Mobile App Module received: {}", message);
    }
}

/// Observer that feeds outgoing serial lines into the event loop.
pub struct FrameForwarder {
    event_tx: mpsc::Sender<CaneEvent>,
}

impl FrameForwarder {
    pub fn new(event_tx: mpsc::Sender<CaneEvent>) -> Self {
        Self { event_tx }
    }
}

impl Observer<String> for FrameForwarder {
    fn update(&self, message: &String) {
        if let Err(e) = self.event_tx.try_send(CaneEvent::Frame(message.clone())) {
            warn!("Dropping serial frame: {}", e);
        }
    }
}
