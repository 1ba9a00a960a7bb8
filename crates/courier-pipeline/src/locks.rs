//! Per-item run serialization
//!
//! A run for a given item key waits until every earlier run for that key has
//! reached a terminal state. Runs for different keys never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct ItemLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> ItemGuard {
        let lock = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        ItemGuard {
            key: key.to_string(),
            locks: self.inner.clone(),
            guard: Some(guard),
        }
    }

    /// Whether a run currently holds `key`
    pub fn is_active(&self, key: &str) -> bool {
        self.inner
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys with a holder or waiter
    pub fn tracked_keys(&self) -> usize {
        self.inner.len()
    }
}

/// Held for the duration of one run; releases and prunes the key on drop
pub struct ItemGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ItemGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map still references the mutex: no holder, no waiter.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
