//! Per-key async locks
//!
//! Lifecycle transitions for one participant (and for one publish name) must
//! run one at a time, while unrelated keys proceed in parallel. Entries are
//! dropped from the table once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Guards holding or waiting on `lock`
    users: usize,
}

#[derive(Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    ///
    /// Cancel-safe: dropping the future while it waits releases its claim on
    /// the table entry.
    pub(crate) async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };

        let mut held = KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

pub(crate) struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut slots = self.owner.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock("alice").await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let mut tasks = Vec::new();

        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("alice").await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(10)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = Arc::new(KeyedLocks::new());
        let holder = locks.lock("alice").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("alice").await;
            })
        };
        tokio::task::yield_now().await;

        // Release while the waiter is queued, then cancel it before it runs
        drop(holder);
        waiter.abort();
        let _ = waiter.await;

        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_waiter_releases_entry() {
        let locks = KeyedLocks::new();
        {
            let _holder = locks.lock("alice").await;
            let waited =
                tokio::time::timeout(Duration::from_millis(20), locks.lock("alice")).await;
            assert!(waited.is_err());
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _alice = locks.lock("alice").await;
        let bob = tokio::time::timeout(Duration::from_millis(100), locks.lock("bob")).await;
        assert!(bob.is_ok());
    }
}
