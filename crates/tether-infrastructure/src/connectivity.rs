//! Connectivity monitor fed by the platform's network-status bridge.

use async_trait::async_trait;
use std::sync::Arc;
use tether_core::connectivity::{ConnectivityMonitor, ConnectivityState};
use tokio::sync::watch;

/// A connectivity monitor whose state is pushed in from outside.
///
/// The host shell forwards its network-status callbacks to
/// [`ManualConnectivityMonitor::set_online`]; subscribers are notified only
/// on actual transitions.
#[derive(Clone)]
pub struct ManualConnectivityMonitor {
    sender: Arc<watch::Sender<ConnectivityState>>,
}

impl ManualConnectivityMonitor {
    pub fn new(initial: ConnectivityState) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn online() -> Self {
        Self::new(ConnectivityState::online())
    }

    pub fn offline() -> Self {
        Self::new(ConnectivityState::offline())
    }

    /// Records the latest platform state. Returns true if it changed.
    pub fn set_online(&self, is_online: bool) -> bool {
        let changed = self.sender.send_if_modified(|state| {
            if state.is_online == is_online {
                return false;
            }
            state.is_online = is_online;
            true
        });

        if changed {
            if is_online {
                tracing::info!("[Connectivity] Back online");
            } else {
                tracing::info!("[Connectivity] Went offline - using cached data");
            }
        }

        changed
    }

    pub fn is_online(&self) -> bool {
        self.sender.borrow().is_online
    }
}

impl Default for ManualConnectivityMonitor {
    fn default() -> Self {
        Self::new(ConnectivityState::default())
    }
}

#[async_trait]
impl ConnectivityMonitor for ManualConnectivityMonitor {
    fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.sender.subscribe()
    }

    async fn current(&self) -> ConnectivityState {
        *self.sender.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let monitor = ManualConnectivityMonitor::offline();
        let mut receiver = monitor.subscribe();
        assert!(!receiver.borrow().is_online);

        assert!(monitor.set_online(true));
        receiver.changed().await.unwrap();
        assert!(receiver.borrow_and_update().is_online);
        assert!(monitor.current().await.is_online);
    }

    #[tokio::test]
    async fn test_repeated_state_does_not_notify() {
        let monitor = ManualConnectivityMonitor::online();
        let receiver = monitor.subscribe();

        assert!(!monitor.set_online(true));
        assert!(!receiver.has_changed().unwrap());
    }
}
