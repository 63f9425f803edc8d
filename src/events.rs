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

//! Event processing and dispatch.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bluetooth::CaneDevice;
use crate::detection::{self, CaneSample, DetectionHistory, Zone};
use crate::state::AppState;
use crate::status::DeviceStatusManager;
use crate::storage::{EventHistory, EventKind};

/// Events coming from the cane link.
#[derive(Debug, Clone)]
pub enum CaneEvent {
    /// Cane paired and connected.
    Connected { device: CaneDevice },
    /// Cane connection closed.
    Disconnected,
    /// Raw serial line from the cane.
    Frame(String),
    /// Link error.
    Error(String),
}

/// Applies cane events to the shared state.
pub struct EventProcessor {
    state: Arc<AppState>,
    status: Arc<DeviceStatusManager>,
    history: Option<EventHistory>,
    detections: DetectionHistory,
}

impl EventProcessor {
    pub fn new(state: Arc<AppState>, status: Arc<DeviceStatusManager>) -> Self {
        Self {
            state,
            status,
            history: None,
            detections: DetectionHistory::new(),
        }
    }

    /// Also record events in the persistent history.
    pub fn with_history(mut self, history: EventHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn detections(&self) -> &DetectionHistory {
        &self.detections
    }

    /// Process a single event.
    pub fn process_event(&mut self, event: CaneEvent) -> Result<()> {
        match event {
            CaneEvent::Connected { device } => {
                info!("Cane connected: {} ({})", device.name, device.id);
                let detail = device.name.clone();
                self.state.set_connected(device);
                self.status.update_connection_status(true);
                self.record(EventKind::Connected, &detail);
            }
            CaneEvent::Disconnected => {
                info!("Cane disconnected");
                self.state.set_disconnected();
                self.status.update_connection_status(false);
                self.record(EventKind::Disconnected, "");
            }
            CaneEvent::Frame(line) => {
                self.handle_frame(&line);
            }
            CaneEvent::Error(e) => {
                error!("Cane link error: {}", e);
                self.state.set_error();
                self.record(EventKind::Error, &e);
            }
        }
        Ok(())
    }

    fn handle_frame(&mut self, line: &str) {
        if let Some(sample) = detection::parse_line(line) {
            self.accept_sample(sample);
            return;
        }

        let Some(field) = detection::parse_field(line) else {
            debug!("Ignoring serial line: {}", line.trim());
            return;
        };
        debug!("Serial field: {:?}", field);
        if let Some(sample) = self.state.apply_serial_field(field) {
            self.accept_sample(sample);
        }
    }

    fn accept_sample(&mut self, sample: CaneSample) {
        match sample.zone {
            Zone::Danger => {
                warn!("Obstacle at {} cm", sample.distance);
                self.record(EventKind::Danger, &format!("{} cm", sample.distance));
            }
            Zone::Warning => info!("Obstacle approaching: {} cm", sample.distance),
            Zone::Safe => debug!("Path clear: {} cm", sample.distance),
        }

        self.detections.push(sample);
        self.state.set_last_detection(sample);
    }

    fn record(&self, kind: EventKind, detail: &str) {
        if let Some(history) = &self.history {
            if let Err(e) = history.add_entry(kind, detail) {
                error!("Failed to record {:?} event: {}", kind, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionStatus;
    use crate::status::TelemetrySettings;
    use tempfile::tempdir;

    fn processor() -> (EventProcessor, Arc<AppState>, Arc<DeviceStatusManager>) {
        let state = AppState::new();
        let status = DeviceStatusManager::with_seed(TelemetrySettings::default(), 9);
        (
            EventProcessor::new(state.clone(), status.clone()),
            state,
            status,
        )
    }

    #[test]
    fn test_connect_and_disconnect() {
        let (mut processor, state, status) = processor();
        status.attach(state.clone());

        processor
            .process_event(CaneEvent::Connected {
                device: CaneDevice::new("AA:BB:CC:11:22:33", "Assistive_Cane"),
            })
            .unwrap();
        assert_eq!(state.get_status(), ConnectionStatus::Connected);
        assert!(status.get_status().is_connected);
        assert!(state.get_telemetry().is_connected);

        processor.process_event(CaneEvent::Disconnected).unwrap();
        assert_eq!(state.get_status(), ConnectionStatus::Disconnected);
        assert!(!status.get_status().is_connected);
    }

    #[test]
    fn test_frames_become_detections() {
        let (mut processor, state, _) = processor();

        processor
            .process_event(CaneEvent::Frame("Distance: 80 cm Zone: WARNING".to_string()))
            .unwrap();
        processor
            .process_event(CaneEvent::Frame("garbage".to_string()))
            .unwrap();

        assert_eq!(processor.detections().len(), 1);
        assert_eq!(state.get_last_detection().map(|s| s.distance), Some(80));
    }

    #[test]
    fn test_history_records_danger_and_connection() {
        let dir = tempdir().unwrap();
        let history = EventHistory::new(dir.path()).unwrap();
        let (processor, _, _) = processor();
        let mut processor = processor.with_history(history.clone());

        processor
            .process_event(CaneEvent::Connected {
                device: CaneDevice::new("DD:EE:FF:44:55:66", "Cane Backup"),
            })
            .unwrap();
        processor
            .process_event(CaneEvent::Frame("Distance: 15 cm Zone: DANGER".to_string()))
            .unwrap();
        processor
            .process_event(CaneEvent::Frame("Distance: 150 cm Zone: SAFE".to_string()))
            .unwrap();

        let entries = history.get_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EventKind::Danger);
        assert_eq!(entries[0].detail, "15 cm");
        assert_eq!(entries[1].detail, "Cane Backup");
    }

    #[test]
    fn test_link_error() {
        let (mut processor, state, _) = processor();

        processor
            .process_event(CaneEvent::Error("link lost".to_string()))
            .unwrap();

        assert_eq!(state.get_status(), ConnectionStatus::Error);
    }

    #[test]
    fn test_field_frames_pair_into_detection() {
        let (mut processor, state, _) = processor();

        processor
            .process_event(CaneEvent::Frame("DIST,42".to_string()))
            .unwrap();
        assert_eq!(processor.detections().len(), 0);
        assert_eq!(state.get_last_distance(), Some(42));

        processor
            .process_event(CaneEvent::Frame("ZONE,DANGER".to_string()))
            .unwrap();

        assert_eq!(processor.detections().len(), 1);
        assert_eq!(
            state.get_last_detection(),
            Some(CaneSample::new(42, Zone::Danger))
        );
        assert_eq!(state.get_last_zone(), Some(Zone::Danger));
    }
}
