//! Keyed blob storage for session state
//!
//! The session engine persists one opaque blob per session key. Backends
//! implement `KeyedStore`; a missing key is `Ok(None)`, never an error.

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::sync::Arc;

use crate::config::Config;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a keyed store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Stored blob for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(msg) => EngineError::StoreUnavailable(msg),
            corrupt @ StoreError::Corrupt { .. } => EngineError::Serialization(corrupt.to_string()),
        }
    }
}

/// Durable blob storage addressed by session key
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Fetch the blob stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `blob` under `key`, replacing any previous value
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<()>;

    /// List every stored key in ascending order
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Flush and release backend resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Open the backend selected by `[store]`
pub async fn open_store(config: &Config) -> std::result::Result<Arc<dyn KeyedStore>, EngineError> {
    match config.store.backend.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory store; session state will not survive restarts");
            Ok(Arc::new(MemoryStore::new()))
        }
        "sqlite" => {
            let store = SqliteStore::open(&config.store_path()).await?;
            Ok(Arc::new(store))
        }
        other => Err(EngineError::Config(format!(
            "Invalid store backend '{}'",
            other
        ))),
    }
}
