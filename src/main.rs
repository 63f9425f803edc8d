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

//! SmartCane Companion Application

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartcane_companion::bluetooth::{
    BluetoothManager, CaneDevice, FrameForwarder, MobileAppModule, MockScanner, SimulatedSerial,
};
use smartcane_companion::config::Config;
use smartcane_companion::detection::DemoFeed;
use smartcane_companion::emergency::{EmergencyEventSubject, EmergencyTrigger};
use smartcane_companion::events::{CaneEvent, EventProcessor};
use smartcane_companion::state::AppState;
use smartcane_companion::status::{DeviceStatus, DeviceStatusManager};
use smartcane_companion::storage::{self, EventHistory, SettingsStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smartcane_companion=info".parse()?),
        )
        .init();

    info!(
        "Starting SmartCane Companion v{}...",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    // Initialize storage
    let mut settings = SettingsStore::new(&config.data_dir)?;
    let contact = storage::load_contact(&settings);
    match &contact {
        Some(c) => info!("Emergency contact: {} ({})", c.name, c.phone_number),
        None => warn!("No emergency contact configured"),
    }

    let history = if config.history.enabled {
        let mut history = EventHistory::new(&config.data_dir)?;
        history.set_max_entries(config.history.max_entries);
        info!("Event history initialized");
        Some(history)
    } else {
        None
    };

    // Telemetry
    let state = AppState::new();
    state.set_led(storage::load_led(&settings).unwrap_or(config.device.led_on));
    let status = DeviceStatusManager::start(config.device.telemetry())?;
    status.attach(state.clone());
    status.attach(Arc::new(|s: &DeviceStatus| {
        if s.is_connected && s.is_battery_low() {
            warn!("Cane battery low: {:.0}%", s.battery_level);
        }
    }));

    // Emergency alerting
    let emergency = EmergencyEventSubject::with_policy(config.emergency.dispatch_policy());
    emergency.register(Arc::new(move || -> Result<()> {
        match &contact {
            Some(c) => info!("Calling {} at {}", c.name, c.phone_number),
            None => warn!("Emergency triggered but no contact is configured"),
        }
        Ok(())
    }));
    if let Some(history) = &history {
        emergency.register(Arc::new(history.clone()));
    }
    let trigger = EmergencyTrigger::new(emergency.clone(), config.emergency.trigger());

    // Simulated Bluetooth link
    let (event_tx, mut event_rx) = mpsc::channel::<CaneEvent>(32);
    let serial = SimulatedSerial::new();
    let link = Arc::new(BluetoothManager::new(
        serial.clone(),
        config.device.name.clone(),
    ));
    link.attach(Arc::new(MobileAppModule::new()));
    link.attach(Arc::new(FrameForwarder::new(event_tx.clone())));
    link.begin()?;

    // Handle cane events
    let mut processor = EventProcessor::new(state.clone(), status.clone());
    if let Some(history) = history {
        processor = processor.with_history(history);
    }
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let Err(e) = processor.process_event(event) {
                error!("Error processing cane event: {}", e);
            }
        }
    });

    // Pair with the first cane found
    state.set_scanning();
    let scanner = MockScanner::new(Duration::from_millis(config.device.scan_delay_ms));
    let paired: Option<CaneDevice> = scanner.scan().await.into_iter().next();
    match &paired {
        Some(device) => {
            serial.set_client_connected(true);
            event_tx
                .send(CaneEvent::Connected {
                    device: device.clone(),
                })
                .await?;
        }
        None => state.set_disconnected(),
    }

    // Replay detections over the link
    let mut feed = load_feed(&config.data_dir);
    let feed_link = link.clone();
    let feed_period = Duration::from_millis(config.device.feed_interval_ms.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(feed_period);
        loop {
            ticker.tick().await;
            let sample = feed.next_sample();
            if let Err(e) = feed_link.send_data(&sample.to_line()) {
                error!("Failed to send detection: {}", e);
            }
        }
    });

    info!("Ready. Commands: hold, release, status, led, connect, disconnect, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                match line.trim() {
                    "hold" => {
                        trigger.press()?;
                    }
                    "release" => {
                        trigger.release();
                    }
                    "status" => {
                        let telemetry = state.get_telemetry();
                        info!(
                            "{} | battery {:.1}% | signal {}/5 | {:.1}°C | button: {}",
                            state.get_status().as_str(),
                            telemetry.battery_level,
                            telemetry.signal_strength,
                            telemetry.temperature,
                            trigger.state().as_str()
                        );
                        if let Some(sample) = state.get_last_detection() {
                            info!("Last detection: {} cm ({})", sample.distance, sample.zone);
                        }
                        info!("LED is {}", if state.is_led_on() { "ON" } else { "OFF" });
                    }
                    "led" => {
                        let on = state.toggle_led();
                        if let Err(e) = storage::save_led(&mut settings, on) {
                            error!("Failed to save LED state: {}", e);
                        }
                    }
                    "connect" => match &paired {
                        Some(device) => {
                            serial.set_client_connected(true);
                            event_tx
                                .send(CaneEvent::Connected {
                                    device: device.clone(),
                                })
                                .await?;
                        }
                        None => warn!("No cane was found during the scan"),
                    },
                    "disconnect" => {
                        serial.set_client_connected(false);
                        event_tx.send(CaneEvent::Disconnected).await?;
                    }
                    "quit" => {
                        info!("Quit requested");
                        break;
                    }
                    "" => {}
                    other => warn!("Unknown command: {}", other),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    trigger.release();
    status.stop_status_updates();

    info!("SmartCane Companion stopped");
    Ok(())
}

/// Recorded demo data if present, otherwise the built-in walk.
fn load_feed(data_dir: &Path) -> DemoFeed {
    let path = data_dir.join("demoCaneData.json");
    if !path.exists() {
        return DemoFeed::builtin();
    }

    match std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|json| DemoFeed::from_json(&json))
    {
        Ok(feed) => {
            info!("Replaying detections from {:?}", path);
            feed
        }
        Err(e) => {
            error!("Failed to load {:?}, using built-in demo data: {}", path, e);
            DemoFeed::builtin()
        }
    }
}
