//! Connectivity state and the monitor trait that publishes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Process-wide online/offline flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    pub is_online: bool,
}

impl ConnectivityState {
    pub fn online() -> Self {
        Self { is_online: true }
    }

    pub fn offline() -> Self {
        Self { is_online: false }
    }
}

impl Default for ConnectivityState {
    /// The app assumes it is online until told otherwise.
    fn default() -> Self {
        Self::online()
    }
}

/// Source of connectivity transitions.
///
/// The monitor is the only writer of [`ConnectivityState`]; everything else
/// holds a receiver and reads the latest value before each decision.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    /// Returns a receiver that observes every state change.
    fn subscribe(&self) -> watch::Receiver<ConnectivityState>;

    /// Best-effort fetch of the current state.
    async fn current(&self) -> ConnectivityState;
}
