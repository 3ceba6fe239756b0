//! File-backed key-value store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_core::error::{Result, TetherError};
use tether_core::storage::KeyValueStore;

use super::atomic_json::AtomicJsonFile;

type StoreMap = BTreeMap<String, String>;

/// Key-value store persisted as a single JSON object on disk.
///
/// Every write is a locked read-modify-write of the whole file, so values
/// survive a process restart and concurrent writers never interleave. Disk
/// I/O runs on the blocking thread pool.
///
/// File layout:
/// ```text
/// { "offline_data": "<json text>", "offline_queue": "<json text>" }
/// ```
#[derive(Clone)]
pub struct FileKeyValueStore {
    file: Arc<AtomicJsonFile<StoreMap>>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    async fn read_map(&self) -> Result<StoreMap> {
        let file = Arc::clone(&self.file);
        run_blocking(move || Ok(file.load()?.unwrap_or_default())).await
    }

    async fn modify<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StoreMap) -> R + Send + 'static,
        R: Send + 'static,
    {
        let file = Arc::clone(&self.file);
        run_blocking(move || Ok(file.update(StoreMap::new(), f)?)).await
    }
}

async fn run_blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TetherError::internal(format!("Storage task failed: {}", e)))?
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.modify(move |map| {
            map.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.modify(move |map| {
            map.remove(&key);
        })
        .await
    }

    async fn all_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map().await?.into_keys().collect())
    }

    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<(String, Option<String>)>> {
        let map = self.read_map().await?;
        Ok(keys
            .iter()
            .map(|key| (key.to_string(), map.get(*key).cloned()))
            .collect())
    }

    async fn multi_set(&self, entries: Vec<(String, String)>) -> Result<()> {
        self.modify(move |map| map.extend(entries)).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.modify(move |map| {
            for key in &keys {
                map.remove(key);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileKeyValueStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().join("store.json"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_key_on_fresh_store() {
        let (store, _temp_dir) = create_test_store();
        assert_eq!(store.get("offline_data").await.unwrap(), None);
        assert!(store.all_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let (store, _temp_dir) = create_test_store();

        store.set("theme", "dark".to_string()).await.unwrap();
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));

        store.remove("theme").await.unwrap();
        assert_eq!(store.get("theme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let (store, _temp_dir) = create_test_store();

        store
            .multi_set(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ])
            .await
            .unwrap();

        let values = store.multi_get(&["a", "missing", "c"]).await.unwrap();
        assert_eq!(
            values,
            vec![
                ("a".to_string(), Some("1".to_string())),
                ("missing".to_string(), None),
                ("c".to_string(), Some("3".to_string())),
            ]
        );

        store.multi_remove(&["a", "b"]).await.unwrap();
        assert_eq!(store.all_keys().await.unwrap(), vec!["c".to_string()]);
    }
}
