//! In-process keyed store
//!
//! Holds blobs in a `HashMap` behind an async `RwLock`. Used by tests and by
//! `backend = "memory"` deployments where durability is not required.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{KeyedStore, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
