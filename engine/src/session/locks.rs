//! Per-session turn serialization
//!
//! Each session key maps to its own async mutex. A turn holds the guard from
//! load to save, so turns on one key never interleave while turns on
//! different keys never wait on each other. Tokio's mutex queues waiters in
//! FIFO order, which keeps turns in arrival order.
//!
//! The map holds `Weak` references; a key's mutex is freed once no turn holds
//! or awaits it, and dead entries are pruned as the map grows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Dead entries are swept once the map grows past this many keys
const PRUNE_THRESHOLD: usize = 128;

#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    ///
    /// The returned guard releases the session when dropped, on every exit path.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        self.lock_for(key).lock_owned().await
    }

    /// Number of keys with a live lock
    pub fn live_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if locks.len() > PRUNE_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }
}
