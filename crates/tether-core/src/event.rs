//! Sync reports and the events broadcast to interested UI code.

use serde::{Deserialize, Serialize};

use crate::mutation::QueueItem;
use crate::resource::ResourceKind;

/// What started a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Reconnected,
    Periodic,
    Forced,
    Startup,
}

/// Result of one pass over the mutation queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Failed attempts that left the item queued for another try.
    pub failed: usize,
    /// Items removed after their last allowed attempt failed.
    pub dropped: Vec<QueueItem>,
}

/// Result of a full resync-and-drain cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    pub refreshed: Vec<ResourceKind>,
    pub failed: Vec<(ResourceKind, String)>,
    pub drain: DrainReport,
}

/// Observability events. Delivery is best-effort: slow receivers may lag
/// and miss events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    ConnectivityChanged { is_online: bool },
    SyncStarted { trigger: SyncTrigger },
    SyncCompleted { report: SyncReport },
    /// A queued write was discarded after exhausting its retries. The write
    /// never reached the server.
    MutationDropped { item: QueueItem, last_error: String },
    /// A durable write failed; state for this session lives in memory only.
    PersistenceDegraded { key: String, error: String },
}
