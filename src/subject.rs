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

//! Observer registration shared by every subject in the application.
//!
//! Observers are held as `Arc` handles and compared by identity, so the same
//! handle can be detached later without the observer type implementing `Eq`.

use parking_lot::RwLock;
use std::sync::Arc;

/// How a list treats a handle that is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Every attach appends, so one handle can be notified several times.
    Duplicates,
    /// A handle is stored at most once; registration order is kept.
    Unique,
}

/// Ordered collection of observer handles.
pub struct ObserverList<T: ?Sized> {
    entries: Vec<Arc<T>>,
    policy: Registration,
}

/// Identity comparison on the data pointer only.
fn same_handle<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl<T: ?Sized> ObserverList<T> {
    pub fn new(policy: Registration) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> Registration {
        self.policy
    }

    /// Add a handle. Returns `false` when a unique list already holds it.
    pub fn insert(&mut self, observer: Arc<T>) -> bool {
        if self.policy == Registration::Unique && self.contains(&observer) {
            return false;
        }
        self.entries.push(observer);
        true
    }

    /// Remove the first occurrence of `observer`. Returns whether one was found.
    pub fn remove<U: ?Sized>(&mut self, observer: &Arc<U>) -> bool {
        match self.entries.iter().position(|o| same_handle(o, observer)) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains<U: ?Sized>(&self, observer: &Arc<U>) -> bool {
        self.entries.iter().any(|o| same_handle(o, observer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clone the handles so notification can run without holding a lock.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.clone()
    }
}

/// Receiver of messages published by a [`Subject`].
pub trait Observer<M>: Send + Sync {
    fn update(&self, message: &M);
}

impl<M, F> Observer<M> for F
where
    F: Fn(&M) + Send + Sync,
{
    fn update(&self, message: &M) {
        self(message)
    }
}

/// Minimal subject: attach and broadcast, no detach.
pub struct Subject<M> {
    observers: RwLock<ObserverList<dyn Observer<M>>>,
}

impl<M> Default for Subject<M> {
    fn default() -> Self {
        Self {
            observers: RwLock::new(ObserverList::new(Registration::Duplicates)),
        }
    }
}

impl<M> Subject<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, observer: Arc<dyn Observer<M>>) {
        self.observers.write().insert(observer);
    }

    /// Call `update` on every observer in attach order.
    pub fn notify(&self, message: &M) {
        let observers = self.observers.read().snapshot();
        for observer in observers {
            observer.update(message);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}
