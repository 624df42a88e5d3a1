use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::StringStorage;

/// In-memory string storage backed by a HashMap
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStorageError {
    #[error("memory storage error: {0}")]
    Internal(String),
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .read()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StringStorage for MemoryStorage {
    type Error = MemoryStorageError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let inner = self.inner.read().map_err(|e| {
            MemoryStorageError::Internal(format!("failed to acquire read lock: {}", e))
        })?;

        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        let mut inner = self.inner.write().map_err(|e| {
            MemoryStorageError::Internal(format!("failed to acquire write lock: {}", e))
        })?;

        inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let mut inner = self.inner.write().map_err(|e| {
            MemoryStorageError::Internal(format!("failed to acquire write lock: {}", e))
        })?;

        inner.remove(key);
        Ok(())
    }
}
