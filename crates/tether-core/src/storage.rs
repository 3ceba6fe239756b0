//! Persistent key-value store trait.

use async_trait::async_trait;

use crate::error::Result;

/// Durable string-keyed storage provided by the platform.
///
/// The batch variants have sequential default implementations; backends
/// that can batch natively should override them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn all_keys(&self) -> Result<Vec<String>>;

    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push((key.to_string(), self.get(key).await?));
        }
        Ok(values)
    }

    async fn multi_set(&self, entries: Vec<(String, String)>) -> Result<()> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}
