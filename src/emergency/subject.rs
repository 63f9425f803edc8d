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

//! Emergency event subject.
//!
//! Broadcasts a payload-free "emergency triggered" event so the button that
//! raises it stays decoupled from whoever reacts to it.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::subject::{ObserverList, Registration};

/// Reacts to an emergency being triggered.
pub trait EmergencyListener: Send + Sync {
    fn on_emergency(&self) -> anyhow::Result<()>;
}

impl<F> EmergencyListener for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn on_emergency(&self) -> anyhow::Result<()> {
        self()
    }
}

/// What `notify` does when a listener fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Keep calling the remaining listeners and report every failure.
    #[default]
    Isolate,
    /// Stop at the first failure; later listeners are skipped.
    FailFast,
}

/// Failure of an emergency broadcast.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("emergency listener #{position} failed, remaining listeners skipped: {cause}")]
    Aborted {
        position: usize,
        cause: anyhow::Error,
    },
    #[error("{} of {total} emergency listeners failed", .failures.len())]
    Partial {
        total: usize,
        failures: Vec<(usize, anyhow::Error)>,
    },
}

/// Subject for the emergency event. A listener is registered at most once.
pub struct EmergencyEventSubject {
    listeners: RwLock<ObserverList<dyn EmergencyListener>>,
    policy: DispatchPolicy,
}

impl EmergencyEventSubject {
    pub fn new() -> Arc<Self> {
        Self::with_policy(DispatchPolicy::default())
    }

    pub fn with_policy(policy: DispatchPolicy) -> Arc<Self> {
        Arc::new(Self {
            listeners: RwLock::new(ObserverList::new(Registration::Unique)),
            policy,
        })
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Register a listener. Returns `false` if it was already registered.
    pub fn register(&self, listener: Arc<dyn EmergencyListener>) -> bool {
        self.listeners.write().insert(listener)
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn unregister<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.listeners.write().remove(listener)
    }

    /// Call every listener in registration order.
    pub fn notify(&self) -> Result<(), NotifyError> {
        let listeners = self.listeners.read().snapshot();
        let total = listeners.len();
        info!("Emergency triggered, notifying {} listeners", total);

        let mut failures = Vec::new();
        for (position, listener) in listeners.into_iter().enumerate() {
            if let Err(cause) = listener.on_emergency() {
                match self.policy {
                    DispatchPolicy::FailFast => {
                        warn!(
                            "Emergency listener #{} failed, skipping {} remaining: {}",
                            position,
                            total - position - 1,
                            cause
                        );
                        return Err(NotifyError::Aborted { position, cause });
                    }
                    DispatchPolicy::Isolate => {
                        error!("Emergency listener #{} failed: {}", position, cause);
                        failures.push((position, cause));
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Partial { total, failures })
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Drop all listeners.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}
