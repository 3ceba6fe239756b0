//! Broadcast channel for [`SyncEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use tether_core::event::SyncEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Fan-out of sync events to whoever is listening.
///
/// Emitting with no subscribers is not an error; events are simply dropped.
/// Slow subscribers lag and skip events rather than blocking the emitter.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("[EventBus] No subscribers, event dropped");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Sticky "persistence degraded" flag shared by the cache and the queue.
///
/// The first failure for a store flips the flag and emits
/// [`SyncEvent::PersistenceDegraded`]; later failures are only logged.
#[derive(Debug, Default)]
pub(crate) struct PersistenceHealth {
    degraded: AtomicBool,
}

impl PersistenceHealth {
    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub(crate) fn report_failure(&self, component: &str, key: &str, error: String, events: &EventBus) {
        tracing::warn!(
            "[{}] Failed to persist '{}', continuing in memory: {}",
            component,
            key,
            error
        );
        if !self.degraded.swap(true, Ordering::AcqRel) {
            events.emit(SyncEvent::PersistenceDegraded {
                key: key.to_string(),
                error,
            });
        }
    }
}
