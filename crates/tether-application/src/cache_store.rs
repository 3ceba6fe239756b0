//! Last-known-good mirror of every server-side resource.

use serde_json::Value;
use std::sync::Arc;
use tether_core::clock::Clock;
use tether_core::error::Result;
use tether_core::resource::ResourceKind;
use tether_core::snapshot::{CACHE_STORAGE_KEY, CacheSnapshot};
use tether_core::storage::KeyValueStore;
use tokio::sync::RwLock;

use crate::events::{EventBus, PersistenceHealth};

/// Write-through cache of the [`CacheSnapshot`].
///
/// The in-memory snapshot is authoritative. Every mutation is persisted to
/// the key-value store under [`CACHE_STORAGE_KEY`] while the write lock is
/// held, so the stored copy never goes backwards. A failed write marks the
/// store degraded and the session carries on from memory.
pub struct CacheStore {
    snapshot: RwLock<CacheSnapshot>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    health: PersistenceHealth,
}

impl CacheStore {
    pub fn new(
        snapshot: CacheSnapshot,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            store,
            clock,
            events,
            health: PersistenceHealth::default(),
        }
    }

    /// Rebuilds the cache from the raw stored text.
    ///
    /// Missing or unreadable data yields an empty snapshot; a partial stored
    /// object is merged over defaults.
    pub fn restore(
        raw: Option<&str>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self::new(decode_snapshot(raw), store, clock, events)
    }

    /// Loads the persisted snapshot from `store`.
    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        match store.get(CACHE_STORAGE_KEY).await {
            Ok(raw) => Self::restore(raw.as_deref(), store, clock, events),
            Err(e) => {
                let cache = Self::new(CacheSnapshot::default(), store, clock, events);
                cache.health.report_failure(
                    "CacheStore",
                    CACHE_STORAGE_KEY,
                    e.to_string(),
                    &cache.events,
                );
                cache
            }
        }
    }

    /// Replaces the cached value for `kind` and stamps the sync time.
    ///
    /// # Arguments
    ///
    /// * `kind` - The resource being refreshed
    /// * `data` - The full server value; collections must be JSON arrays
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` when a collection receives a non-array, in
    /// which case the cache is left untouched. Persistence failures are not
    /// errors.
    pub async fn update(&self, kind: ResourceKind, data: Value) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        snapshot.set(kind, data)?;
        snapshot.last_sync = snapshot.last_sync.max(self.clock.now_millis());
        tracing::debug!(
            "[CacheStore] Updated {} (lastSync={})",
            kind,
            snapshot.last_sync
        );
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Current cached value for `kind`; never fails.
    pub async fn read(&self, kind: ResourceKind) -> Value {
        self.snapshot.read().await.get(kind)
    }

    pub async fn is_present(&self, kind: ResourceKind) -> bool {
        self.snapshot.read().await.is_present(kind)
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Milliseconds since epoch of the last refresh; 0 if never synced.
    pub async fn last_sync(&self) -> i64 {
        self.snapshot.read().await.last_sync
    }

    /// Resets every resource and the sync stamp.
    pub async fn clear(&self) {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = CacheSnapshot::default();
        tracing::info!("[CacheStore] Cache cleared");
        self.persist(&snapshot).await;
    }

    pub fn is_degraded(&self) -> bool {
        self.health.is_degraded()
    }

    async fn persist(&self, snapshot: &CacheSnapshot) {
        let result = match serde_json::to_string(snapshot) {
            Ok(serialized) => self.store.set(CACHE_STORAGE_KEY, serialized).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            self.health
                .report_failure("CacheStore", CACHE_STORAGE_KEY, e.to_string(), &self.events);
        }
    }
}

fn decode_snapshot(raw: Option<&str>) -> CacheSnapshot {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return CacheSnapshot::default();
    };
    match serde_json::from_str(raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("[CacheStore] Discarding unreadable cached data: {}", e);
            CacheSnapshot::default()
        }
    }
}
