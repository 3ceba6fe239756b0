//! The operations the UI layer calls.
//!
//! Reads go to the network when online and fall back to the cache; writes
//! go to the network when online and into the mutation queue when not.
//! Nothing here returns `Err`: every outcome is a result structure.

use serde_json::{Value, json};
use std::sync::Arc;
use tether_core::api::RemoteApi;
use tether_core::clock::format_sync_time;
use tether_core::connectivity::ConnectivityMonitor;
use tether_core::event::{SyncEvent, SyncTrigger};
use tether_core::mutation::{MutationKind, QueueItem};
use tether_core::outcome::{FetchResult, MutationResult, StorageInfo, format_bytes};
use tether_core::resource::ResourceKind;
use tether_core::storage::KeyValueStore;
use tokio::sync::broadcast;

use crate::cache_store::CacheStore;
use crate::events::EventBus;
use crate::mutation_queue::MutationQueue;
use crate::sync_coordinator::{SyncCoordinator, SyncOutcome};

pub const OFFLINE_NO_CACHE_ERROR: &str = "No internet connection and no cached data available";
pub const ONLINE_NO_CACHE_ERROR: &str = "Request failed and no cached data available";

/// Offline-aware façade over the cache, the queue and the remote API.
///
/// Cheap to clone; clones share every component.
#[derive(Clone)]
pub struct OfflineClient {
    cache: Arc<CacheStore>,
    queue: Arc<MutationQueue>,
    coordinator: Arc<SyncCoordinator>,
    api: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    store: Arc<dyn KeyValueStore>,
    events: EventBus,
}

impl OfflineClient {
    pub fn new(
        cache: Arc<CacheStore>,
        queue: Arc<MutationQueue>,
        coordinator: Arc<SyncCoordinator>,
        api: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        store: Arc<dyn KeyValueStore>,
        events: EventBus,
    ) -> Self {
        Self {
            cache,
            queue,
            coordinator,
            api,
            connectivity,
            store,
            events,
        }
    }

    /// Reads `kind`, preferring the network.
    ///
    /// A successful online read refreshes the cache and is returned with
    /// `from_cache: false`. A failed online read, or any read while offline,
    /// is served from the cache when it holds data; otherwise the result is
    /// a failure. An empty cached collection counts as no data.
    pub async fn fetch_resource(&self, kind: ResourceKind) -> FetchResult {
        let online = self.is_online().await;

        if online {
            let response = self.api.fetch_resource(kind).await;
            if response.success {
                if let Some(data) = response.payload()
                    && let Err(e) = self.cache.update(kind, data.clone()).await
                {
                    tracing::warn!("[OfflineClient] Not caching {} response: {}", kind, e);
                }
                return FetchResult::fresh(response);
            }
            tracing::debug!(
                "[OfflineClient] Fetching {} failed, trying cache: {}",
                kind,
                response.error_message()
            );
        }

        if self.cache.is_present(kind).await {
            tracing::debug!("[OfflineClient] Serving {} from cache", kind);
            return FetchResult::cached(self.cache.read(kind).await);
        }

        FetchResult::unavailable(if online {
            ONLINE_NO_CACHE_ERROR
        } else {
            OFFLINE_NO_CACHE_ERROR
        })
    }

    /// Sends a write, or queues it when offline.
    ///
    /// Online results are returned as the server gave them, failures
    /// included. Offline writes succeed immediately with `queued: true`.
    pub async fn submit_mutation(&self, kind: MutationKind, payload: Value) -> MutationResult {
        if self.is_online().await {
            return MutationResult::delivered(self.api.deliver_mutation(kind, &payload).await);
        }

        let item = self.queue.enqueue(kind, payload).await;
        MutationResult::queued(json!({
            "queued": true,
            "id": item.id,
            "message": format!("{} queued for offline execution", kind.label()),
        }))
    }

    pub async fn send_command(&self, payload: Value) -> MutationResult {
        self.submit_mutation(MutationKind::Command, payload).await
    }

    pub async fn generate_payload(&self, payload: Value) -> MutationResult {
        self.submit_mutation(MutationKind::PayloadGeneration, payload).await
    }

    pub async fn create_campaign(&self, payload: Value) -> MutationResult {
        self.submit_mutation(MutationKind::CampaignCreation, payload).await
    }

    pub async fn discover_targets(&self, payload: Value) -> MutationResult {
        self.submit_mutation(MutationKind::TargetDiscovery, payload).await
    }

    /// Runs a full resync-and-drain cycle now.
    pub async fn force_sync(&self) -> SyncOutcome {
        self.coordinator.run_cycle(SyncTrigger::Forced).await
    }

    pub async fn queue_length(&self) -> usize {
        self.queue.len().await
    }

    /// Milliseconds since epoch of the last refresh; 0 if never synced.
    pub async fn last_sync_time(&self) -> i64 {
        self.cache.last_sync().await
    }

    pub async fn is_online(&self) -> bool {
        self.connectivity.current().await.is_online
    }

    pub fn is_syncing(&self) -> bool {
        self.coordinator.is_syncing()
    }

    /// Whether any write to the persistent store has failed this session.
    pub fn persistence_degraded(&self) -> bool {
        self.cache.is_degraded() || self.queue.is_degraded()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn clear_queue(&self) {
        self.queue.clear().await;
    }

    pub async fn pending_mutations(&self) -> Vec<QueueItem> {
        self.queue.items().await
    }

    /// Summary of local storage for a settings screen.
    pub async fn storage_info(&self) -> StorageInfo {
        let snapshot = self.cache.snapshot().await;
        StorageInfo {
            cached_items: snapshot.present_count(),
            queue_items: self.queue.len().await,
            last_sync: format_sync_time(snapshot.last_sync),
            cache_size: format_bytes(self.used_bytes().await),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    async fn used_bytes(&self) -> usize {
        let keys = match self.store.all_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("[OfflineClient] Cannot list stored keys: {}", e);
                return 0;
            }
        };
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        match self.store.multi_get(&key_refs).await {
            Ok(entries) => entries
                .iter()
                .map(|(key, value)| key.len() + value.as_ref().map_or(0, String::len))
                .sum(),
            Err(e) => {
                tracing::warn!("[OfflineClient] Cannot read stored values: {}", e);
                0
            }
        }
    }
}
