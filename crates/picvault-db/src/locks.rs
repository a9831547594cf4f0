//! Per-record mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = Arc<StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

/// Serializes mutating operations on the same record id.
///
/// Operations on different ids never contend. Entries are dropped from the
/// map once the last holder or waiter releases them.
#[derive(Clone, Default)]
pub struct RecordLocks {
    locks: LockMap,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: Uuid) -> RecordGuard {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            map.entry(id).or_default().clone()
        };

        let guard = lock.lock_owned().await;

        RecordGuard {
            id,
            locks: self.locks.clone(),
            _guard: guard,
        }
    }

    /// Number of ids currently held or awaited.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .map(|map| map.len())
            .unwrap_or_default()
    }
}

/// Exclusive access to one record id; released on drop.
pub struct RecordGuard {
    id: Uuid,
    locks: LockMap,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Two references left means only the map and this guard know the lock.
        if map
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            map.remove(&self.id);
        }
    }
}
