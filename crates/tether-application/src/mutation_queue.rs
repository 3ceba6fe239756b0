//! Durable FIFO of writes captured while offline.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tether_core::api::ApiResponse;
use tether_core::clock::Clock;
use tether_core::event::{DrainReport, SyncEvent};
use tether_core::mutation::{MAX_RETRIES, MutationKind, QUEUE_STORAGE_KEY, QueueItem};
use tether_core::storage::KeyValueStore;
use tokio::sync::Mutex;

use crate::events::{EventBus, PersistenceHealth};

/// Pending mutations, persisted under [`QUEUE_STORAGE_KEY`] after every
/// change.
///
/// Drains are serialized: a second `drain` waits for the first to finish.
/// The item list lock is never held across a delivery.
pub struct MutationQueue {
    items: Mutex<Vec<QueueItem>>,
    drain_lock: Mutex<()>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    health: PersistenceHealth,
}

impl MutationQueue {
    pub fn new(
        items: Vec<QueueItem>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            items: Mutex::new(items),
            drain_lock: Mutex::new(()),
            store,
            clock,
            events,
            health: PersistenceHealth::default(),
        }
    }

    /// Rebuilds the queue from the raw stored text; unreadable data yields an
    /// empty queue.
    pub fn restore(
        raw: Option<&str>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self::new(decode_queue(raw), store, clock, events)
    }

    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        match store.get(QUEUE_STORAGE_KEY).await {
            Ok(raw) => Self::restore(raw.as_deref(), store, clock, events),
            Err(e) => {
                let queue = Self::new(Vec::new(), store, clock, events);
                queue.health.report_failure(
                    "MutationQueue",
                    QUEUE_STORAGE_KEY,
                    e.to_string(),
                    &queue.events,
                );
                queue
            }
        }
    }

    /// Appends a mutation and persists the queue. No delivery is attempted.
    pub async fn enqueue(&self, kind: MutationKind, payload: Value) -> QueueItem {
        let item = QueueItem::new(kind, payload, self.clock.now_millis());
        let mut items = self.items.lock().await;
        items.push(item.clone());
        tracing::info!(
            "[MutationQueue] Queued {} as {} ({} pending)",
            kind,
            item.id,
            items.len()
        );
        self.persist(&items).await;
        item
    }

    /// Attempts every item present when the drain starts, oldest first, one
    /// at a time.
    ///
    /// A successful delivery removes the item. A failure bumps its
    /// `retry_count`; at [`MAX_RETRIES`] the item is dropped, logged and
    /// announced with [`SyncEvent::MutationDropped`]. Items enqueued while
    /// the drain runs wait for the next one.
    ///
    /// # Arguments
    ///
    /// * `deliver` - Sends one mutation and reports the server's answer
    pub async fn drain<F, Fut>(&self, deliver: F) -> DrainReport
    where
        F: Fn(MutationKind, Value) -> Fut,
        Fut: Future<Output = ApiResponse>,
    {
        let _drain = self.drain_lock.lock().await;
        let pending = self.items.lock().await.clone();
        let mut report = DrainReport::default();

        if pending.is_empty() {
            return report;
        }
        tracing::info!("[MutationQueue] Processing {} queued items", pending.len());

        for item in pending {
            report.attempted += 1;
            let response = deliver(item.kind, item.payload.clone()).await;

            let mut items = self.items.lock().await;
            let position = items.iter().position(|queued| queued.id == item.id);

            if response.success {
                report.delivered += 1;
                tracing::debug!("[MutationQueue] Delivered {}", item.id);
                if let Some(index) = position {
                    items.remove(index);
                }
            } else {
                report.failed += 1;
                let last_error = response.error_message();
                let Some(index) = position else {
                    continue;
                };
                items[index].retry_count += 1;
                if items[index].is_exhausted() {
                    let dropped = items.remove(index);
                    tracing::warn!(
                        "[MutationQueue] Dropping {} ({}) after {} failed attempts: {}",
                        dropped.id,
                        dropped.kind,
                        MAX_RETRIES,
                        last_error
                    );
                    self.events.emit(SyncEvent::MutationDropped {
                        item: dropped.clone(),
                        last_error,
                    });
                    report.dropped.push(dropped);
                } else {
                    tracing::debug!(
                        "[MutationQueue] Delivery of {} failed (attempt {}): {}",
                        item.id,
                        items[index].retry_count,
                        last_error
                    );
                }
            }

            self.persist(&items).await;
        }

        report
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Clone of the pending items, oldest first.
    pub async fn items(&self) -> Vec<QueueItem> {
        self.items.lock().await.clone()
    }

    /// Discards every pending item.
    pub async fn clear(&self) {
        let mut items = self.items.lock().await;
        let discarded = items.len();
        items.clear();
        tracing::info!("[MutationQueue] Cleared {} queued items", discarded);
        self.persist(&items).await;
    }

    pub fn is_degraded(&self) -> bool {
        self.health.is_degraded()
    }

    async fn persist(&self, items: &[QueueItem]) {
        let result = match serde_json::to_string(items) {
            Ok(serialized) => self.store.set(QUEUE_STORAGE_KEY, serialized).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            self.health.report_failure(
                "MutationQueue",
                QUEUE_STORAGE_KEY,
                e.to_string(),
                &self.events,
            );
        }
    }
}

fn decode_queue(raw: Option<&str>) -> Vec<QueueItem> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("[MutationQueue] Discarding unreadable queue: {}", e);
            Vec::new()
        }
    }
}
