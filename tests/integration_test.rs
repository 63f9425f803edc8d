//! Integration tests for the telemetry and emergency flows.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use smartcane_companion::bluetooth::{BluetoothManager, CaneDevice, FrameForwarder, SimulatedSerial};
use smartcane_companion::detection::{DemoFeed, Zone};
use smartcane_companion::emergency::{
    EmergencyEventSubject, EmergencyTrigger, TriggerSettings, TriggerState,
};
use smartcane_companion::events::{CaneEvent, EventProcessor};
use smartcane_companion::state::{AppState, ConnectionStatus};
use smartcane_companion::status::{DeviceStatus, DeviceStatusManager, TelemetrySettings};
use smartcane_companion::storage::{EventHistory, EventKind};

#[tokio::test(start_paused = true)]
async fn test_connected_cane_streams_telemetry() {
    let state = AppState::new();
    let status = DeviceStatusManager::with_seed(TelemetrySettings::default(), 11);
    status.attach(state.clone());
    status.start_status_updates().unwrap();

    let mut processor = EventProcessor::new(state.clone(), status.clone());
    processor
        .process_event(CaneEvent::Connected {
            device: CaneDevice::new("AA:BB:CC:11:22:33", "Assistive_Cane"),
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(9500)).await;
    tokio::task::yield_now().await;

    let telemetry = state.get_telemetry();
    assert_eq!(state.get_status(), ConnectionStatus::Connected);
    assert!(telemetry.is_connected);
    assert!(telemetry.battery_level < 85.0);
    assert!(telemetry.battery_level >= 85.0 - 1.5);
    assert_eq!(telemetry, status.get_status());

    processor.process_event(CaneEvent::Disconnected).unwrap();
    let frozen = status.get_status();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(status.get_status(), frozen);
    assert!(!state.get_telemetry().is_connected);

    status.stop_status_updates();
}

#[tokio::test]
async fn test_serial_frames_reach_event_loop() {
    let (tx, mut rx) = mpsc::channel(16);
    let serial = SimulatedSerial::new();
    let link = BluetoothManager::new(serial.clone(), "SmartCane");
    link.attach(Arc::new(FrameForwarder::new(tx)));
    link.begin().unwrap();

    let state = AppState::new();
    let status = DeviceStatusManager::new(TelemetrySettings::default());
    let mut processor = EventProcessor::new(state.clone(), status);

    // Nothing goes out before a client connects.
    let mut feed = DemoFeed::builtin();
    assert!(!link.send_data(&feed.current().to_line()).unwrap());

    serial.set_client_connected(true);
    for _ in 0..4 {
        assert!(link.send_data(&feed.advance().to_line()).unwrap());
    }
    drop(link);

    while let Some(event) = rx.recv().await {
        processor.process_event(event).unwrap();
    }

    assert_eq!(serial.sent_lines().len(), 4);
    assert_eq!(processor.detections().len(), 4);
    assert_eq!(
        state.get_last_detection().map(|s| s.zone),
        Some(Zone::Danger)
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_listener_does_not_block_history() {
    let dir = tempfile::tempdir().unwrap();
    let history = EventHistory::new(dir.path()).unwrap();

    let subject = EmergencyEventSubject::new();
    subject.register(Arc::new(|| -> anyhow::Result<()> {
        Err(anyhow::anyhow!("banner unavailable"))
    }));
    subject.register(Arc::new(history.clone()));

    let trigger = EmergencyTrigger::new(subject.clone(), TriggerSettings::default());
    trigger.press().unwrap();
    tokio::time::sleep(Duration::from_millis(3050)).await;

    assert_eq!(trigger.state(), TriggerState::Calling);
    let emergencies = history.get_recent_of_kind(EventKind::Emergency, 10).unwrap();
    assert_eq!(emergencies.len(), 1);
}

#[test]
fn test_status_observers_share_one_manager() {
    let status = DeviceStatusManager::with_seed(TelemetrySettings::default(), 5);
    let first = Arc::new(Mutex::new(Vec::<DeviceStatus>::new()));
    let second = Arc::new(Mutex::new(Vec::<DeviceStatus>::new()));

    let sink = first.clone();
    status.attach(Arc::new(move |s: &DeviceStatus| sink.lock().push(*s)));
    let sink = second.clone();
    status.attach(Arc::new(move |s: &DeviceStatus| sink.lock().push(*s)));

    status.notify();

    assert_eq!(first.lock().len(), 1);
    assert_eq!(second.lock().len(), 1);
    assert_eq!(first.lock()[0], DeviceStatus::default());
}
