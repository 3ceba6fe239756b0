//! Process-wide wiring of the offline layer.

use anyhow::Context;
use std::sync::Arc;
use tether_core::api::RemoteApi;
use tether_core::clock::{Clock, SystemClock};
use tether_core::config::TetherConfig;
use tether_core::connectivity::ConnectivityMonitor;
use tether_core::error::Result;
use tether_core::mutation::QUEUE_STORAGE_KEY;
use tether_core::snapshot::CACHE_STORAGE_KEY;
use tether_core::storage::KeyValueStore;
use tether_infrastructure::{ConfigService, FileKeyValueStore, HttpTransport, TetherPaths};
use tokio::sync::Mutex;

use crate::cache_store::CacheStore;
use crate::events::EventBus;
use crate::gateway::ApiGateway;
use crate::mutation_queue::MutationQueue;
use crate::offline_client::OfflineClient;
use crate::scheduler::SyncScheduler;
use crate::sync_coordinator::SyncCoordinator;

/// Owns every component of the offline layer.
///
/// Built once at startup and handed to whoever needs it. Background sync
/// only runs after [`OfflineContext::start_background`].
pub struct OfflineContext {
    config: TetherConfig,
    events: EventBus,
    connectivity: Arc<dyn ConnectivityMonitor>,
    coordinator: Arc<SyncCoordinator>,
    client: OfflineClient,
    scheduler: Mutex<Option<SyncScheduler>>,
}

impl OfflineContext {
    /// Restores the cache and queue from `store` and wires the components.
    ///
    /// If the store cannot be read the layer starts empty, in degraded mode.
    pub async fn initialize(
        config: TetherConfig,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new();

        let (cache, queue) = match store.multi_get(&[CACHE_STORAGE_KEY, QUEUE_STORAGE_KEY]).await {
            Ok(entries) => (
                CacheStore::restore(
                    stored_value(&entries, CACHE_STORAGE_KEY),
                    store.clone(),
                    clock.clone(),
                    events.clone(),
                ),
                MutationQueue::restore(
                    stored_value(&entries, QUEUE_STORAGE_KEY),
                    store.clone(),
                    clock.clone(),
                    events.clone(),
                ),
            ),
            Err(e) => {
                tracing::warn!(
                    "[OfflineContext] Failed to load offline data, starting empty: {}",
                    e
                );
                (
                    CacheStore::load(store.clone(), clock.clone(), events.clone()).await,
                    MutationQueue::load(store.clone(), clock.clone(), events.clone()).await,
                )
            }
        };
        let cache = Arc::new(cache);
        let queue = Arc::new(queue);

        tracing::info!(
            "[OfflineContext] Loaded {} cached resources and {} queued mutations",
            cache.snapshot().await.present_count(),
            queue.len().await
        );

        let coordinator = Arc::new(SyncCoordinator::new(
            cache.clone(),
            queue.clone(),
            api.clone(),
            connectivity.clone(),
            events.clone(),
        ));
        let client = OfflineClient::new(
            cache,
            queue,
            coordinator.clone(),
            api,
            connectivity.clone(),
            store,
            events.clone(),
        );

        Self {
            config,
            events,
            connectivity,
            coordinator,
            client,
            scheduler: Mutex::new(None),
        }
    }

    /// Loads `config.toml` from `paths` and builds the production stack.
    pub async fn load(
        paths: &TetherPaths,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Result<Self> {
        let config = ConfigService::from_paths(paths)?.get_config()?;
        Self::build(config, paths, connectivity).await
    }

    /// Builds the production stack from an already loaded configuration,
    /// using the platform directories.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `connectivity` - The platform's network-status source
    pub async fn from_config(
        config: TetherConfig,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Result<Self> {
        Self::build(config, &TetherPaths::default(), connectivity).await
    }

    /// File-backed store, HTTP transport and the system clock.
    async fn build(
        config: TetherConfig,
        paths: &TetherPaths,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Result<Self> {
        let store_path = match &config.storage.path {
            Some(path) => path.clone(),
            None => paths
                .store_file()
                .context("Failed to resolve store path")?,
        };
        tracing::info!(
            "[OfflineContext] Using store {:?} and server {}",
            store_path,
            config.server.base_url()
        );

        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(store_path));
        let gateway = ApiGateway::new(
            HttpTransport::from_config(&config.server),
            config.endpoints.clone(),
            config.server.timeout(),
        );

        Ok(Self::initialize(
            config,
            store,
            Arc::new(gateway),
            connectivity,
            Arc::new(SystemClock),
        )
        .await)
    }

    pub fn client(&self) -> OfflineClient {
        self.client.clone()
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        self.coordinator.clone()
    }

    /// Starts the scheduler. Returns false if it is already running.
    pub async fn start_background(&self) -> bool {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(SyncScheduler::is_running) {
            return false;
        }
        *scheduler = Some(SyncScheduler::start(
            self.coordinator.clone(),
            self.connectivity.clone(),
            self.events.clone(),
            &self.config.sync,
        ));
        true
    }

    /// Stops background work and waits for the tasks to exit.
    pub async fn shutdown(&self) {
        let scheduler = self.scheduler.lock().await.take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }
}

fn stored_value<'a>(entries: &'a [(String, Option<String>)], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|(stored_key, _)| stored_key == key)
        .and_then(|(_, value)| value.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingStore, ManualClock, ScriptedRemoteApi};
    use serde_json::json;
    use tether_core::api::ApiResponse;
    use tether_core::config::SyncConfig;
    use tether_core::resource::ResourceKind;
    use tether_infrastructure::{InMemoryKeyValueStore, ManualConnectivityMonitor};

    fn manual_config() -> TetherConfig {
        TetherConfig {
            sync: SyncConfig::manual(),
            ..TetherConfig::default()
        }
    }

    fn api() -> Arc<ScriptedRemoteApi> {
        Arc::new(ScriptedRemoteApi::new(
            |_| ApiResponse::ok(json!([])),
            ApiResponse::ok(json!({})),
        ))
    }

    #[tokio::test]
    async fn test_initialize_restores_persisted_state() {
        let store = InMemoryKeyValueStore::with_entries([
            (CACHE_STORAGE_KEY, r#"{"bots":[{"id":"b1"}],"lastSync":500}"#),
            (
                QUEUE_STORAGE_KEY,
                r#"[{"id":"offline_1_x","type":"command","data":{},"timestamp":1,"retryCount":1}]"#,
            ),
        ]);

        let context = OfflineContext::initialize(
            manual_config(),
            Arc::new(store),
            api(),
            Arc::new(ManualConnectivityMonitor::offline()),
            Arc::new(ManualClock::new(1_000)),
        )
        .await;
        let client = context.client();

        assert_eq!(client.queue_length().await, 1);
        assert_eq!(client.last_sync_time().await, 500);
        let result = client.fetch_resource(ResourceKind::Bots).await;
        assert!(result.from_cache);
        assert_eq!(result.data, Some(json!([{"id": "b1"}])));
    }

    #[tokio::test]
    async fn test_unreadable_store_starts_degraded() {
        let context = OfflineContext::initialize(
            manual_config(),
            Arc::new(FailingStore),
            api(),
            Arc::new(ManualConnectivityMonitor::offline()),
            Arc::new(ManualClock::new(1)),
        )
        .await;
        let client = context.client();

        assert!(client.persistence_degraded());
        assert_eq!(client.queue_length().await, 0);
        let queued = client.send_command(json!({"command": "sysinfo"})).await;
        assert!(queued.success && queued.queued);
    }

    #[tokio::test]
    async fn test_background_start_is_idempotent() {
        let context = OfflineContext::initialize(
            manual_config(),
            Arc::new(InMemoryKeyValueStore::new()),
            api(),
            Arc::new(ManualConnectivityMonitor::online()),
            Arc::new(ManualClock::new(1)),
        )
        .await;

        assert!(context.start_background().await);
        assert!(!context.start_background().await);
        context.shutdown().await;
        assert!(context.start_background().await);
        context.shutdown().await;
    }

    #[tokio::test]
    async fn test_load_uses_config_and_store_under_paths() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let paths = TetherPaths::new(Some(temp_dir.path()));
        let config_path = paths.config_file().unwrap();
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(
            &config_path,
            "[server]\nhost = \"10.0.0.5\"\nuse_ssl = false\n\n[sync]\nauto_sync_interval_secs = 0\nsync_on_start = false\n",
        )
        .unwrap();

        let context = OfflineContext::load(&paths, Arc::new(ManualConnectivityMonitor::offline()))
            .await
            .unwrap();
        context.client().send_command(json!({"command": "ls"})).await;

        assert_eq!(context.config().server.host, "10.0.0.5");
        assert!(!context.config().sync.sync_on_start);
        assert!(paths.store_file().unwrap().exists());
    }
}
