//! services/api/src/adapters/store.rs
//!
//! A JSON-file-backed implementation of the `ProfileStore` port: one flat
//! object on disk, keyed by string, the server-side stand-in for the
//! browser's localStorage.

use async_trait::async_trait;
use autocoach_core::ports::{PortError, PortResult, ProfileStore};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::warn;

/// A persistent key-value store backed by a single JSON object file.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a new `JsonFileStore`. The file is created lazily on the
    /// first `set`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the whole object. A missing or malformed file is treated as
    /// empty; there is no migration logic.
    async fn load(&self) -> Map<String, Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("Store file {} is malformed; treating as empty.", self.path.display());
                Map::new()
            }
        }
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn get(&self, key: &str) -> PortResult<Option<Value>> {
        Ok(self.load().await.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> PortResult<()> {
        let mut map = self.load().await;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Storage(e.to_string()))?;
        }
        let serialized = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| PortError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert_eq!(store.get("userProfile").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        store.set("userProfile", json!({"name": "Alex"})).await.unwrap();
        store.set("chatHistory", json!([])).await.unwrap();

        assert_eq!(
            store.get("userProfile").await.unwrap(),
            Some(json!({"name": "Alex"}))
        );
        assert_eq!(store.get("chatHistory").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn malformed_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "not json {{{").await.unwrap();

        let store = JsonFileStore::new(path);
        assert_eq!(store.get("userProfile").await.unwrap(), None);

        // And a set afterwards replaces the malformed content.
        store.set("userProfile", json!({"name": "Alex"})).await.unwrap();
        assert!(store.get("userProfile").await.unwrap().is_some());
    }
}
