//! # Timer Registry
//!
//! Named, resettable one-shot timers. Each timer is a tokio task; whether
//! it may fire is decided under the registry lock by comparing generations,
//! so a timer that was stopped or replaced never runs its callback.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Callback run when a timer elapses.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

struct TimerEntry {
    handle: JoinHandle<()>,
    duration: Duration,
    callback: TimerCallback,
    generation: u64,
}

#[derive(Default)]
struct Registry {
    entries: Mutex<HashMap<String, TimerEntry>>,
    generations: AtomicU64,
}

/// Shared registry of keyed timers. Clones share the same map.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Registry>,
}

impl TimerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key`, replacing any live timer with that key.
    pub fn start<F>(&self, key: impl Into<String>, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut entries = self.inner.entries.lock();
        self.arm(&mut entries, key.into(), duration, Arc::new(callback));
    }

    /// Re-arm `key` with its stored duration and callback.
    ///
    /// Returns `false` (and does nothing) for an unknown key.
    pub fn reset(&self, key: &str) -> bool {
        let mut entries = self.inner.entries.lock();
        let Some((duration, callback)) = entries
            .get(key)
            .map(|e| (e.duration, Arc::clone(&e.callback)))
        else {
            return false;
        };
        self.arm(&mut entries, key.to_string(), duration, callback);
        true
    }

    /// Cancel and remove `key`. Unknown keys are ignored.
    pub fn stop(&self, key: &str) {
        if let Some(entry) = self.inner.entries.lock().remove(key) {
            entry.handle.abort();
            trace!(key, "timer stopped");
        }
    }

    /// Cancel every timer.
    pub fn stop_all(&self) {
        let drained: Vec<TimerEntry> = self.inner.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            entry.handle.abort();
        }
    }

    /// Whether `key` has a live timer.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// True when no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn arm(
        &self,
        entries: &mut HashMap<String, TimerEntry>,
        key: String,
        duration: Duration,
        callback: TimerCallback,
    ) {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::downgrade(&self.inner);
        let task_key = key.clone();
        let task_callback = Arc::clone(&callback);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            fire(registry, &task_key, generation, task_callback);
        });
        if let Some(previous) = entries.insert(
            key,
            TimerEntry {
                handle,
                duration,
                callback,
                generation,
            },
        ) {
            previous.handle.abort();
        }
    }
}

fn fire(registry: Weak<Registry>, key: &str, generation: u64, callback: TimerCallback) {
    let Some(registry) = registry.upgrade() else {
        return;
    };
    let current = {
        let mut entries = registry.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.generation == generation => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    };
    if current {
        trace!(key, "timer fired");
        callback();
    }
}
