//! Resync-and-drain cycles.
//!
//! A cycle fetches every resource kind concurrently, writes each success into
//! the [`CacheStore`], then drains the [`MutationQueue`]. At most one cycle
//! runs at a time; a trigger that arrives mid-cycle is dropped.

use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_core::api::RemoteApi;
use tether_core::connectivity::ConnectivityMonitor;
use tether_core::event::{DrainReport, SyncEvent, SyncReport, SyncTrigger};
use tether_core::resource::ResourceKind;

use crate::cache_store::CacheStore;
use crate::events::EventBus;
use crate::mutation_queue::MutationQueue;

/// How a requested cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    SkippedOffline,
    SkippedInProgress,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Clears the in-progress flag on every exit path, including a dropped
/// future.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    cache: Arc<CacheStore>,
    queue: Arc<MutationQueue>,
    api: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    events: EventBus,
    in_progress: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        cache: Arc<CacheStore>,
        queue: Arc<MutationQueue>,
        api: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        events: EventBus,
    ) -> Self {
        Self {
            cache,
            queue,
            api,
            connectivity,
            events,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Runs one full cycle unless offline or another cycle is in flight.
    pub async fn run_cycle(&self, trigger: SyncTrigger) -> SyncOutcome {
        if !self.connectivity.current().await.is_online {
            tracing::debug!("[SyncCoordinator] Offline, skipping {:?} sync", trigger);
            return SyncOutcome::SkippedOffline;
        }
        let Some(_guard) = self.try_begin() else {
            tracing::debug!(
                "[SyncCoordinator] Sync already in progress, dropping {:?} trigger",
                trigger
            );
            return SyncOutcome::SkippedInProgress;
        };

        tracing::info!("[SyncCoordinator] Starting {:?} sync", trigger);
        self.events.emit(SyncEvent::SyncStarted { trigger });

        let (refreshed, failed) = self.refresh_all().await;
        let drain = if self.connectivity.current().await.is_online {
            self.drain_queue().await
        } else {
            tracing::info!("[SyncCoordinator] Went offline during fetch, leaving queue intact");
            DrainReport::default()
        };

        tracing::info!(
            "[SyncCoordinator] Sync finished: {} refreshed, {} failed, {}/{} queued delivered",
            refreshed.len(),
            failed.len(),
            drain.delivered,
            drain.attempted
        );
        let report = SyncReport {
            trigger,
            refreshed,
            failed,
            drain,
        };
        self.events.emit(SyncEvent::SyncCompleted {
            report: report.clone(),
        });
        SyncOutcome::Completed(report)
    }

    /// Refreshes a single resource outside a full cycle.
    ///
    /// Skipped while offline or while a full cycle is running, since the
    /// cycle fetches every kind anyway. Returns whether the cache was
    /// updated.
    pub async fn refresh_resource(&self, kind: ResourceKind) -> bool {
        if self.is_syncing() || !self.connectivity.current().await.is_online {
            return false;
        }
        let response = self.api.fetch_resource(kind).await;
        match (response.success, response.payload()) {
            (true, Some(data)) => match self.cache.update(kind, data.clone()).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("[SyncCoordinator] Rejected {} refresh: {}", kind, e);
                    false
                }
            },
            (true, None) => false,
            (false, _) => {
                tracing::debug!(
                    "[SyncCoordinator] Polling {} failed: {}",
                    kind,
                    response.error.as_deref().unwrap_or("unknown error")
                );
                false
            }
        }
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                flag: &self.in_progress,
            })
    }

    async fn refresh_all(&self) -> (Vec<ResourceKind>, Vec<(ResourceKind, String)>) {
        let fetches = ResourceKind::ALL.into_iter().map(|kind| {
            let api = Arc::clone(&self.api);
            async move { (kind, api.fetch_resource(kind).await) }
        });
        let responses = join_all(fetches).await;

        let mut refreshed = Vec::new();
        let mut failed = Vec::new();
        for (kind, response) in responses {
            if !response.success {
                let error = response.error_message();
                tracing::warn!("[SyncCoordinator] Failed to refresh {}: {}", kind, error);
                failed.push((kind, error));
                continue;
            }
            let Some(data) = response.payload() else {
                continue;
            };
            match self.cache.update(kind, data.clone()).await {
                Ok(()) => refreshed.push(kind),
                Err(e) => {
                    tracing::warn!("[SyncCoordinator] Rejected {} data: {}", kind, e);
                    failed.push((kind, e.to_string()));
                }
            }
        }
        (refreshed, failed)
    }

    async fn drain_queue(&self) -> DrainReport {
        self.queue
            .drain(|kind, payload| {
                let api = Arc::clone(&self.api);
                async move { api.deliver_mutation(kind, &payload).await }
            })
            .await
    }
}
