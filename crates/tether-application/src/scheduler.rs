//! Background tasks that trigger sync work.
//!
//! - connectivity watcher: offline to online runs a `Reconnected` cycle
//! - periodic timer: a full cycle every `auto_sync_interval` plus jitter
//! - pollers: one task per resource kind with a refresh interval
//!
//! All tasks stop when the scheduler's cancellation token fires, abandoning
//! any cycle they are running. Queue items are persisted one at a time, so an
//! abandoned drain leaves undelivered items queued with their retry counts.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tether_core::config::SyncConfig;
use tether_core::connectivity::{ConnectivityMonitor, ConnectivityState};
use tether_core::event::{SyncEvent, SyncTrigger};
use tether_core::resource::ResourceKind;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::EventBus;
use crate::sync_coordinator::SyncCoordinator;

pub struct SyncScheduler {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawns the background tasks on the current tokio runtime.
    pub fn start(
        coordinator: Arc<SyncCoordinator>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        events: EventBus,
        config: &SyncConfig,
    ) -> Self {
        let token = CancellationToken::new();
        let mut handles = Vec::new();

        // Subscribe before spawning so a transition right after start is seen.
        handles.push(tokio::spawn(watch_connectivity(
            coordinator.clone(),
            connectivity.subscribe(),
            events,
            token.clone(),
        )));

        if config.sync_on_start {
            let coordinator = coordinator.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = coordinator.run_cycle(SyncTrigger::Startup) => {}
                }
            }));
        }

        if let Some(interval) = config.auto_sync_interval() {
            handles.push(tokio::spawn(periodic_sync(
                coordinator.clone(),
                interval,
                config.jitter_ms,
                token.clone(),
            )));
        }

        for kind in ResourceKind::ALL {
            if let Some(interval) = config.refresh_interval(kind) {
                handles.push(tokio::spawn(poll_resource(
                    coordinator.clone(),
                    kind,
                    interval,
                    token.clone(),
                )));
            }
        }

        tracing::info!("[SyncScheduler] Started {} background tasks", handles.len());
        Self { token, handles }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.handles.iter().any(|handle| !handle.is_finished())
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Cancels every task and waits for them to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await
                && e.is_panic()
            {
                tracing::error!("[SyncScheduler] Background task panicked: {}", e);
            }
        }
        tracing::info!("[SyncScheduler] Stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn watch_connectivity(
    coordinator: Arc<SyncCoordinator>,
    mut receiver: watch::Receiver<ConnectivityState>,
    events: EventBus,
    token: CancellationToken,
) {
    let mut was_online = receiver.borrow_and_update().is_online;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    tracing::debug!("[SyncScheduler] Connectivity source closed");
                    break;
                }
                let is_online = receiver.borrow_and_update().is_online;
                if is_online == was_online {
                    continue;
                }
                was_online = is_online;
                events.emit(SyncEvent::ConnectivityChanged { is_online });

                if is_online {
                    tracing::info!("[SyncScheduler] Connection restored, syncing");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = coordinator.run_cycle(SyncTrigger::Reconnected) => {}
                    }
                } else {
                    tracing::info!("[SyncScheduler] Connection lost, serving cached data");
                }
            }
        }
    }
}

async fn periodic_sync(
    coordinator: Arc<SyncCoordinator>,
    interval: Duration,
    jitter_ms: u64,
    token: CancellationToken,
) {
    loop {
        let delay = with_jitter(interval, jitter_ms);
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = coordinator.run_cycle(SyncTrigger::Periodic) => {}
                }
            }
        }
    }
}

async fn poll_resource(
    coordinator: Arc<SyncCoordinator>,
    kind: ResourceKind,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = coordinator.refresh_resource(kind) => {}
                }
            }
        }
    }
}

fn with_jitter(base: Duration, jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
}
