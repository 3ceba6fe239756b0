//! Queued write operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TetherError;

/// Storage key the pending queue is persisted under.
pub const QUEUE_STORAGE_KEY: &str = "offline_queue";

/// Failed delivery attempts after which a queued mutation is dropped.
pub const MAX_RETRIES: u32 = 3;

/// The closed set of writes that may be deferred while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Command,
    PayloadGeneration,
    CampaignCreation,
    TargetDiscovery,
}

impl MutationKind {
    pub const ALL: [MutationKind; 4] = [
        MutationKind::Command,
        MutationKind::PayloadGeneration,
        MutationKind::CampaignCreation,
        MutationKind::TargetDiscovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Command => "command",
            MutationKind::PayloadGeneration => "payload_generation",
            MutationKind::CampaignCreation => "campaign_creation",
            MutationKind::TargetDiscovery => "target_discovery",
        }
    }

    /// Human-readable label used in "queued" acknowledgements.
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::Command => "Command",
            MutationKind::PayloadGeneration => "Payload generation",
            MutationKind::CampaignCreation => "Campaign creation",
            MutationKind::TargetDiscovery => "Target discovery",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MutationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TetherError::not_found("mutation kind", s))
    }
}

/// A write captured for later delivery.
///
/// Serialized with the field names the mobile client already stores, so a
/// queue written by an earlier build still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MutationKind,
    #[serde(rename = "data")]
    pub payload: Value,
    /// Milliseconds since epoch at enqueue time.
    #[serde(rename = "timestamp")]
    pub enqueued_at: i64,
    #[serde(rename = "retryCount", default)]
    pub retry_count: u32,
}

impl QueueItem {
    /// Creates a fresh item with a generated id and no retries.
    pub fn new(kind: MutationKind, payload: Value, enqueued_at: i64) -> Self {
        Self {
            id: format!("offline_{}_{}", enqueued_at, Uuid::new_v4().simple()),
            kind,
            payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    /// Whether the item has used up its delivery attempts.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= MAX_RETRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_item_has_unique_prefixed_id() {
        let a = QueueItem::new(MutationKind::Command, json!({}), 10);
        let b = QueueItem::new(MutationKind::Command, json!({}), 10);
        assert!(a.id.starts_with("offline_10_"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.retry_count, 0);
    }

    #[test]
    fn test_stored_field_names() {
        let item = QueueItem::new(
            MutationKind::CampaignCreation,
            json!({"name": "spring"}),
            42,
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "campaign_creation");
        assert_eq!(value["data"]["name"], "spring");
        assert_eq!(value["timestamp"], 42);
        assert_eq!(value["retryCount"], 0);
    }

    #[test]
    fn test_exhaustion_threshold() {
        let mut item = QueueItem::new(MutationKind::TargetDiscovery, json!({}), 0);
        item.retry_count = MAX_RETRIES - 1;
        assert!(!item.is_exhausted());
        item.retry_count += 1;
        assert!(item.is_exhausted());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(
            "payload_generation".parse::<MutationKind>().unwrap(),
            MutationKind::PayloadGeneration
        );
        assert!("terminate".parse::<MutationKind>().is_err());
    }
}
