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

//! Hold-to-call emergency button.
//!
//! The call is placed only after the button has been held for the full hold
//! duration. Releasing earlier cancels it. Once placed, the trigger stays in
//! `Calling` for the call duration and then returns to `Idle`.

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::subject::EmergencyEventSubject;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSettings {
    pub hold_duration: Duration,
    pub call_duration: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            hold_duration: Duration::from_secs(3),
            call_duration: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Holding,
    Calling,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerState::Idle => "Idle",
            TriggerState::Holding => "Holding...",
            TriggerState::Calling => "Calling emergency contact",
        }
    }
}

struct Inner {
    state: TriggerState,
    held_since: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

pub struct EmergencyTrigger {
    subject: Arc<EmergencyEventSubject>,
    settings: TriggerSettings,
    inner: Mutex<Inner>,
}

impl EmergencyTrigger {
    pub fn new(subject: Arc<EmergencyEventSubject>, settings: TriggerSettings) -> Arc<Self> {
        Arc::new(Self {
            subject,
            settings,
            inner: Mutex::new(Inner {
                state: TriggerState::Idle,
                held_since: None,
                task: None,
            }),
        })
    }

    pub fn state(&self) -> TriggerState {
        self.inner.lock().state
    }

    /// Fraction of the hold completed, 0.0 unless the button is held.
    pub fn progress(&self) -> f64 {
        let inner = self.inner.lock();
        match (inner.state, inner.held_since) {
            (TriggerState::Holding, Some(since)) => {
                let hold = self.settings.hold_duration.as_secs_f64();
                if hold <= 0.0 {
                    return 1.0;
                }
                (since.elapsed().as_secs_f64() / hold).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Start holding the button. Returns `false` unless the trigger was idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn press(self: &Arc<Self>) -> Result<bool> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow!("Emergency trigger needs a tokio runtime: {}", e))?;

        let mut inner = self.inner.lock();
        if inner.state != TriggerState::Idle {
            debug!("Press ignored while {}", inner.state.as_str());
            return Ok(false);
        }

        inner.state = TriggerState::Holding;
        inner.held_since = Some(Instant::now());

        let trigger: Weak<Self> = Arc::downgrade(self);
        let hold = self.settings.hold_duration;
        let call = self.settings.call_duration;

        inner.task = Some(runtime.spawn(async move {
            tokio::time::sleep(hold).await;
            match trigger.upgrade() {
                Some(trigger) if trigger.place_call() => {}
                _ => return,
            }

            tokio::time::sleep(call).await;
            if let Some(trigger) = trigger.upgrade() {
                trigger.end_call();
            }
        }));

        info!("Emergency button held");
        Ok(true)
    }

    /// Let go of the button. Returns `true` if a pending hold was cancelled.
    pub fn release(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != TriggerState::Holding {
            return false;
        }

        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.state = TriggerState::Idle;
        inner.held_since = None;
        info!("Emergency button released before the call was placed");
        true
    }

    fn place_call(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != TriggerState::Holding {
                return false;
            }
            inner.state = TriggerState::Calling;
            inner.held_since = None;
        }

        info!("Emergency call placed");
        if let Err(e) = self.subject.notify() {
            error!("Emergency broadcast incomplete: {}", e);
        }
        true
    }

    fn end_call(&self) {
        let mut inner = self.inner.lock();
        if inner.state == TriggerState::Calling {
            inner.state = TriggerState::Idle;
            inner.task = None;
            info!("Emergency call finished");
        }
    }
}

impl Drop for EmergencyTrigger {
    fn drop(&mut self) {
        if let Some(task) = self.inner.get_mut().task.take() {
            task.abort();
        }
    }
}
