//! Per-key mutual exclusion.
//!
//! The on-demand resolver's check-decide-create sequence must serialise per
//! resource reference, but unrelated references should resolve in parallel.
//! One busy-set plus a condvar gives exactly that without a mutex per key
//! living forever.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

pub struct KeyedLock<K: Eq + Hash + Clone> {
    busy: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K: Eq + Hash + Clone> KeyedLock<K> {
    pub fn new() -> Self {
        Self {
            busy: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Block until `key` is free, then hold it until the guard drops.
    pub fn lock(&self, key: K) -> KeyedLockGuard<'_, K> {
        let mut busy = self.busy.lock().unwrap();
        while busy.contains(&key) {
            busy = self.released.wait(busy).unwrap();
        }
        busy.insert(key.clone());
        KeyedLockGuard { lock: self, key }
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.busy.lock().unwrap().len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLock<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct KeyedLockGuard<'a, K: Eq + Hash + Clone> {
    lock: &'a KeyedLock<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyedLockGuard<'_, K> {
    fn drop(&mut self) {
        self.lock.busy.lock().unwrap().remove(&self.key);
        self.lock.released.notify_all();
    }
}
