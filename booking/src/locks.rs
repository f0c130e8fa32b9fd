//! Per-key async mutexes.
//!
//! Admission on one event must not interleave with another admission on the same
//! event, and two transitions on one reservation must not interleave either. Keys
//! that nobody holds or waits on are dropped from the registry on the next lock.

use crate::types::{EventId, ReservationId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Guard returned by [`KeyedLocks::lock`]; the key is released on drop
pub type KeyedGuard = OwnedMutexGuard<()>;

/// Registry of one async mutex per key
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &K) -> KeyedGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Guards and waiters hold a clone, so a count of one means unused.
            locks.retain(|held, mutex| held == key || Arc::strong_count(mutex) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Event and reservation locks shared by every service of one engine.
///
/// Whoever needs both takes the event lock first.
#[derive(Debug, Default)]
pub struct BookingLocks {
    /// Serializes admission decisions per event
    pub events: KeyedLocks<EventId>,
    /// Serializes lifecycle transitions per reservation
    pub reservations: KeyedLocks<ReservationId>,
}

impl BookingLocks {
    /// Create empty registries
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
