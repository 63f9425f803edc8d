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

//! Device status manager.
//!
//! Owns the simulated telemetry of the paired cane and fans every change out
//! to attached observers. While the cane is connected a background task
//! drains the battery and re-rolls signal and temperature once per period.

use anyhow::{anyhow, Result};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::observer::{DeviceStatus, DeviceStatusObserver};
use crate::subject::{ObserverList, Registration};

/// Timing and drain rate of the simulated telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySettings {
    /// Time between two telemetry ticks.
    pub interval: Duration,
    /// Upper bound of the battery drop per tick, in percent.
    pub max_battery_drain: f64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_battery_drain: 0.5,
        }
    }
}

/// Single source of truth for the cane's telemetry.
pub struct DeviceStatusManager {
    status: RwLock<DeviceStatus>,
    observers: RwLock<ObserverList<dyn DeviceStatusObserver>>,
    rng: Mutex<StdRng>,
    settings: TelemetrySettings,
    updates: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceStatusManager {
    /// Create a manager with default status. The update task is not started.
    pub fn new(settings: TelemetrySettings) -> Arc<Self> {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Create a manager whose simulation is reproducible.
    pub fn with_seed(settings: TelemetrySettings, seed: u64) -> Arc<Self> {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: TelemetrySettings, rng: StdRng) -> Arc<Self> {
        Arc::new(Self {
            status: RwLock::new(DeviceStatus::default()),
            observers: RwLock::new(ObserverList::new(Registration::Duplicates)),
            rng: Mutex::new(rng),
            settings,
            updates: Mutex::new(None),
        })
    }

    /// Create a manager and start its update task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(settings: TelemetrySettings) -> Result<Arc<Self>> {
        let manager = Self::new(settings);
        manager.start_status_updates()?;
        Ok(manager)
    }

    /// Append an observer. Attaching the same handle twice notifies it twice.
    pub fn attach(&self, observer: Arc<dyn DeviceStatusObserver>) {
        self.observers.write().insert(observer);
    }

    /// Remove the first attachment of `observer`, if any.
    pub fn detach<O: ?Sized>(&self, observer: &Arc<O>) {
        if !self.observers.write().remove(observer) {
            debug!("Detach ignored: observer was not attached");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Broadcast the current status to every attached observer.
    ///
    /// Locks are released before observers run, so an observer may read the
    /// status or change the observer list from inside `update`.
    pub fn notify(&self) {
        let status = *self.status.read();
        let observers = self.observers.read().snapshot();
        for observer in observers {
            observer.update(&status);
        }
    }

    /// Copy of the current status.
    pub fn get_status(&self) -> DeviceStatus {
        *self.status.read()
    }

    /// Set the connection flag and notify observers.
    pub fn update_connection_status(&self, connected: bool) {
        self.status.write().is_connected = connected;
        info!(
            "Cane {}",
            if connected { "connected" } else { "disconnected" }
        );
        self.notify();
    }

    /// Run one telemetry step. Returns `false` (and notifies nobody) while
    /// the cane is disconnected.
    pub fn tick(&self) -> bool {
        {
            let mut status = self.status.write();
            if !status.is_connected {
                return false;
            }

            let mut rng = self.rng.lock();
            let drain = rng.gen::<f64>() * self.settings.max_battery_drain;
            status.battery_level = (status.battery_level - drain).max(0.0);
            status.signal_strength = rng.gen_range(1..=5);
            status.temperature = 20.0 + rng.gen::<f64>() * 10.0;

            debug!(
                "Telemetry tick: battery={:.2} signal={} temperature={:.1}",
                status.battery_level, status.signal_strength, status.temperature
            );
        }
        self.notify();
        true
    }

    /// Spawn the periodic update task. Does nothing if it is already running.
    pub fn start_status_updates(self: &Arc<Self>) -> Result<()> {
        let mut updates = self.updates.lock();
        if updates.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow!("Status updates need a tokio runtime: {}", e))?;

        let period = self.settings.interval.max(Duration::from_millis(1));
        let manager: Weak<Self> = Arc::downgrade(self);

        *updates = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match manager.upgrade() {
                    Some(manager) => {
                        manager.tick();
                    }
                    None => break,
                }
            }
        }));

        info!("Status updates started every {:?}", period);
        Ok(())
    }

    /// Cancel the periodic update task. Safe to call repeatedly.
    pub fn stop_status_updates(&self) {
        if let Some(handle) = self.updates.lock().take() {
            handle.abort();
            info!("Status updates stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.updates
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DeviceStatusManager {
    fn drop(&mut self) {
        if let Some(handle) = self.updates.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        received: Mutex<Vec<DeviceStatus>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.received.lock().len()
        }

        fn last(&self) -> Option<DeviceStatus> {
            self.received.lock().last().copied()
        }
    }

    impl DeviceStatusObserver for Recorder {
        fn update(&self, status: &DeviceStatus) {
            self.received.lock().push(*status);
        }
    }

    fn manager() -> Arc<DeviceStatusManager> {
        DeviceStatusManager::with_seed(TelemetrySettings::default(), 42)
    }

    #[test]
    fn test_default_status() {
        let manager = manager();
        assert_eq!(
            manager.get_status(),
            DeviceStatus {
                battery_level: 85.0,
                signal_strength: 4,
                temperature: 22.0,
                is_connected: false,
            }
        );
        assert!(!manager.is_running());
    }

    #[test]
    fn test_notify_reaches_each_observer_once() {
        let manager = manager();
        let obs1 = Arc::new(Recorder::default());
        let obs2 = Arc::new(Recorder::default());

        manager.attach(obs1.clone());
        manager.attach(obs2.clone());
        manager.notify();

        assert_eq!(obs1.count(), 1);
        assert_eq!(obs2.count(), 1);
        assert_eq!(obs1.last(), Some(manager.get_status()));
    }

    #[test]
    fn test_duplicate_attach_notifies_twice() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());

        manager.attach(obs.clone());
        manager.attach(obs.clone());
        manager.notify();

        assert_eq!(manager.observer_count(), 2);
        assert_eq!(obs.count(), 2);
    }

    #[test]
    fn test_detach_removes_one_occurrence() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        let other = Arc::new(Recorder::default());

        manager.attach(obs.clone());
        manager.attach(other.clone());
        manager.attach(obs.clone());
        manager.detach(&obs);
        manager.notify();

        assert_eq!(obs.count(), 1);
        assert_eq!(other.count(), 1);

        manager.detach(&obs);
        manager.notify();
        assert_eq!(obs.count(), 1);
        assert_eq!(other.count(), 2);
    }

    #[test]
    fn test_detach_unknown_observer_is_noop() {
        let manager = manager();
        let attached = Arc::new(Recorder::default());
        let stranger = Arc::new(Recorder::default());

        manager.attach(attached.clone());
        manager.detach(&stranger);
        manager.notify();

        assert_eq!(manager.observer_count(), 1);
        assert_eq!(attached.count(), 1);
        assert_eq!(stranger.count(), 0);
    }

    #[test]
    fn test_notify_without_observers() {
        let manager = manager();
        manager.notify();
        assert_eq!(manager.observer_count(), 0);
    }

    #[test]
    fn test_get_status_returns_copy() {
        let manager = manager();
        let mut snapshot = manager.get_status();
        snapshot.battery_level = 50.0;
        snapshot.is_connected = true;

        let fresh = manager.get_status();
        assert_eq!(fresh.battery_level, 85.0);
        assert!(!fresh.is_connected);
    }

    #[test]
    fn test_connect_then_disconnect_notifies_in_order() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.attach(obs.clone());

        manager.update_connection_status(true);
        manager.update_connection_status(false);

        let received = obs.received.lock();
        assert_eq!(received.len(), 2);
        assert!(received[0].is_connected);
        assert!(!received[1].is_connected);
        assert!(!manager.get_status().is_connected);
    }

    #[test]
    fn test_tick_while_disconnected_does_nothing() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.attach(obs.clone());

        assert!(!manager.tick());
        assert_eq!(obs.count(), 0);
        assert_eq!(manager.get_status(), DeviceStatus::default());
    }

    #[test]
    fn test_tick_while_connected_stays_in_range() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.update_connection_status(true);
        manager.attach(obs.clone());

        let mut previous = manager.get_status().battery_level;
        for _ in 0..200 {
            assert!(manager.tick());
            let status = manager.get_status();
            assert!(status.battery_level <= previous);
            assert!(status.battery_level >= previous - 0.5);
            assert!((1..=5).contains(&status.signal_strength));
            assert!(status.temperature >= 20.0 && status.temperature < 30.0);
            assert!(status.is_connected);
            previous = status.battery_level;
        }
        assert_eq!(obs.count(), 200);
    }

    #[test]
    fn test_battery_never_negative() {
        let settings = TelemetrySettings {
            max_battery_drain: 50.0,
            ..TelemetrySettings::default()
        };
        let manager = DeviceStatusManager::with_seed(settings, 1);
        manager.update_connection_status(true);

        for _ in 0..100 {
            manager.tick();
        }
        assert_eq!(manager.get_status().battery_level, 0.0);
    }

    #[test]
    fn test_observer_can_reenter_manager() {
        let manager = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&manager);
        let sink = seen.clone();
        manager.attach(Arc::new(move |_: &DeviceStatus| {
            if let Some(manager) = weak.upgrade() {
                sink.lock().push(manager.get_status().is_connected);
            }
        }));

        manager.update_connection_status(true);
        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn test_start_requires_runtime() {
        let manager = manager();
        assert!(manager.start_status_updates().is_err());
        assert!(!manager.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_only_while_connected() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.attach(obs.clone());
        manager.start_status_updates().unwrap();
        assert!(manager.is_running());

        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(obs.count(), 0);
        assert_eq!(manager.get_status().battery_level, 85.0);

        manager.update_connection_status(true);
        tokio::time::sleep(Duration::from_millis(6000)).await;
        tokio::task::yield_now().await;

        // One connection notification plus ticks at 9s and 12s.
        assert_eq!(obs.count(), 3);
        let status = manager.get_status();
        assert!(status.battery_level <= 85.0 && status.battery_level >= 84.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_status_updates_is_idempotent() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.attach(obs.clone());
        manager.update_connection_status(true);
        manager.start_status_updates().unwrap();
        manager.start_status_updates().unwrap();

        tokio::time::sleep(Duration::from_millis(3100)).await;
        tokio::task::yield_now().await;
        assert_eq!(obs.count(), 2);

        manager.stop_status_updates();
        manager.stop_status_updates();
        assert!(!manager.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(obs.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_manager_cancels_updates() {
        let manager = manager();
        let obs = Arc::new(Recorder::default());
        manager.attach(obs.clone());
        manager.update_connection_status(true);
        manager.start_status_updates().unwrap();

        tokio::time::sleep(Duration::from_millis(3100)).await;
        tokio::task::yield_now().await;
        assert_eq!(obs.count(), 2);

        drop(manager);
        tokio::time::sleep(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;

        assert_eq!(obs.count(), 2);
        assert_eq!(Arc::strong_count(&obs), 1);
    }
}
