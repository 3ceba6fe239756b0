//! The last-known-good snapshot of every cached resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TetherError};
use crate::resource::ResourceKind;

/// Storage key the snapshot is persisted under.
pub const CACHE_STORAGE_KEY: &str = "offline_data";

/// Cached copy of every server-side resource plus the last sync stamp.
///
/// Records are kept as opaque JSON; the offline layer never interprets them.
/// Fields missing from a persisted snapshot fall back to their empty default,
/// so older or partial stored documents still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSnapshot {
    pub bots: Vec<Value>,
    pub commands: Vec<Value>,
    pub targets: Vec<Value>,
    pub payloads: Vec<Value>,
    pub campaigns: Vec<Value>,
    pub stats: Option<Value>,
    /// Milliseconds since epoch; 0 means never synced.
    pub last_sync: i64,
}

impl CacheSnapshot {
    /// Returns the cached value for `kind` as JSON.
    ///
    /// Collections come back as arrays (possibly empty); stats comes back as
    /// its value or `Value::Null`.
    pub fn get(&self, kind: ResourceKind) -> Value {
        match self.collection(kind) {
            Some(records) => Value::Array(records.clone()),
            None => self.stats.clone().unwrap_or(Value::Null),
        }
    }

    /// Replaces the value for `kind` wholesale.
    ///
    /// Collections only accept JSON arrays; stats accepts anything, with
    /// `null` clearing it. Does not touch `last_sync`.
    pub fn set(&mut self, kind: ResourceKind, data: Value) -> Result<()> {
        if kind.is_collection() {
            let Value::Array(records) = data else {
                return Err(TetherError::invalid_resource(
                    kind.as_str(),
                    format!("expected a JSON array, got {}", json_type_name(&data)),
                ));
            };
            if let Some(slot) = self.collection_mut(kind) {
                *slot = records;
            }
        } else {
            self.stats = match data {
                Value::Null => None,
                other => Some(other),
            };
        }
        Ok(())
    }

    /// Whether `kind` holds data usable as an offline fallback.
    ///
    /// An empty collection counts as absent: it cannot be told apart from a
    /// resource that has never been synced.
    pub fn is_present(&self, kind: ResourceKind) -> bool {
        match self.collection(kind) {
            Some(records) => !records.is_empty(),
            None => self.stats.is_some(),
        }
    }

    /// Number of resources currently present.
    pub fn present_count(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .filter(|kind| self.is_present(**kind))
            .count()
    }

    fn collection(&self, kind: ResourceKind) -> Option<&Vec<Value>> {
        match kind {
            ResourceKind::Bots => Some(&self.bots),
            ResourceKind::Commands => Some(&self.commands),
            ResourceKind::Targets => Some(&self.targets),
            ResourceKind::Payloads => Some(&self.payloads),
            ResourceKind::Campaigns => Some(&self.campaigns),
            ResourceKind::Stats => None,
        }
    }

    fn collection_mut(&mut self, kind: ResourceKind) -> Option<&mut Vec<Value>> {
        match kind {
            ResourceKind::Bots => Some(&mut self.bots),
            ResourceKind::Commands => Some(&mut self.commands),
            ResourceKind::Targets => Some(&mut self.targets),
            ResourceKind::Payloads => Some(&mut self.payloads),
            ResourceKind::Campaigns => Some(&mut self.campaigns),
            ResourceKind::Stats => None,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_empty_and_never_synced() {
        let snapshot = CacheSnapshot::default();
        assert_eq!(snapshot.last_sync, 0);
        for kind in ResourceKind::ALL {
            assert!(!snapshot.is_present(kind));
        }
        assert_eq!(snapshot.get(ResourceKind::Bots), json!([]));
        assert_eq!(snapshot.get(ResourceKind::Stats), Value::Null);
    }

    #[test]
    fn test_set_rejects_non_array_for_collection() {
        let mut snapshot = CacheSnapshot::default();
        let err = snapshot
            .set(ResourceKind::Targets, json!({"id": 1}))
            .unwrap_err();
        assert!(matches!(err, TetherError::InvalidResource { .. }));
        assert!(snapshot.targets.is_empty());
    }

    #[test]
    fn test_empty_collection_is_not_present() {
        let mut snapshot = CacheSnapshot::default();
        snapshot.set(ResourceKind::Bots, json!([])).unwrap();
        assert!(!snapshot.is_present(ResourceKind::Bots));

        snapshot.set(ResourceKind::Bots, json!([{"id": "b1"}])).unwrap();
        assert!(snapshot.is_present(ResourceKind::Bots));
    }

    #[test]
    fn test_null_stats_clears_singleton() {
        let mut snapshot = CacheSnapshot::default();
        snapshot
            .set(ResourceKind::Stats, json!({"total_bots": 4}))
            .unwrap();
        assert!(snapshot.is_present(ResourceKind::Stats));

        snapshot.set(ResourceKind::Stats, Value::Null).unwrap();
        assert!(!snapshot.is_present(ResourceKind::Stats));
    }

    #[test]
    fn test_partial_stored_document_loads_with_defaults() {
        let stored = r#"{"bots":[{"id":"b1"}],"lastSync":1700000000000}"#;
        let snapshot: CacheSnapshot = serde_json::from_str(stored).unwrap();
        assert_eq!(snapshot.bots.len(), 1);
        assert!(snapshot.campaigns.is_empty());
        assert!(snapshot.stats.is_none());
        assert_eq!(snapshot.last_sync, 1_700_000_000_000);
        assert_eq!(snapshot.present_count(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(CacheSnapshot::default()).unwrap();
        assert!(value.get("lastSync").is_some());
        assert!(value.get("commands").is_some());
    }
}
