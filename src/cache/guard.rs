//! Per-key critical sections for the read-decide-write sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::key::EntityKey;

/// Hands out one async mutex per backing store.
///
/// Keys that name the same table (see [`EntityKey::store_id`]) share a mutex.
/// Holding the guard serializes freshness check, refresh and read-back for
/// that store, while different stores proceed in parallel. The guard is released
/// on drop, so every exit path (including `?` and cancellation) unlocks.
/// Callers must never hold guards for two keys at once.
#[derive(Default)]
pub struct KeyedLocks {
  locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Wait for exclusive access to `key`.
  pub async fn lock(&self, key: &EntityKey) -> OwnedMutexGuard<()> {
    let slot = {
      // The map is only touched here and never across an await, so a
      // poisoned lock still holds a consistent map.
      let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
      Arc::clone(locks.entry(key.store_id()).or_default())
    };
    slot.lock_owned().await
  }

  /// Number of stores that have ever been locked.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::key::Metric;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_same_key_is_exclusive() {
    let locks = Arc::new(KeyedLocks::new());
    let key = EntityKey::new("South Africa", Metric::Deaths).unwrap();
    let inside = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
      let locks = Arc::clone(&locks);
      let key = key.clone();
      let inside = Arc::clone(&inside);
      let max_seen = Arc::clone(&max_seen);
      handles.push(tokio::spawn(async move {
        let _guard = locks.lock(&key).await;
        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
        max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        inside.fetch_sub(1, Ordering::SeqCst);
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert_eq!(locks.len(), 1);
  }

  #[tokio::test]
  async fn test_different_keys_do_not_block() {
    let locks = KeyedLocks::new();
    let deaths = EntityKey::new("Italy", Metric::Deaths).unwrap();
    let recovered = EntityKey::new("Italy", Metric::Recovered).unwrap();

    let _first = locks.lock(&deaths).await;
    let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(&recovered)).await;

    assert!(second.is_ok());
    assert_eq!(locks.len(), 2);
  }

  #[tokio::test]
  async fn test_spellings_of_one_store_share_a_lock() {
    let locks = KeyedLocks::new();
    let upper = EntityKey::new("Italy", Metric::Deaths).unwrap();
    let lower = EntityKey::new("italy", Metric::Deaths).unwrap();

    let _first = locks.lock(&upper).await;
    let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&lower)).await;

    assert!(second.is_err());
    assert_eq!(locks.len(), 1);
  }

  #[tokio::test]
  async fn test_guard_released_on_drop() {
    let locks = KeyedLocks::new();
    let key = EntityKey::new("Italy", Metric::Deaths).unwrap();

    drop(locks.lock(&key).await);
    let again = tokio::time::timeout(Duration::from_millis(100), locks.lock(&key)).await;

    assert!(again.is_ok());
  }
}
