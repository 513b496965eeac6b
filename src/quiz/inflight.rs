use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of keys with an outstanding remote request.
#[derive(Debug)]
pub struct InFlight<K> {
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self { active: Arc::clone(&self.active) }
    }
}

impl<K> Default for InFlight<K> {
    fn default() -> Self {
        Self { active: Arc::new(Mutex::new(HashSet::new())) }
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    /// Claim `key`, or `None` when a request for it is still outstanding.
    /// The claim is released when the returned permit is dropped.
    pub fn try_begin(&self, key: K) -> Option<Permit<K>> {
        if !lock(&self.active).insert(key.clone()) {
            return None;
        }
        Some(Permit { active: Arc::clone(&self.active), key })
    }

    pub fn is_active(&self, key: &K) -> bool {
        lock(&self.active).contains(key)
    }
}

fn lock<K>(active: &Mutex<HashSet<K>>) -> MutexGuard<'_, HashSet<K>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct Permit<K: Eq + Hash> {
    active: Arc<Mutex<HashSet<K>>>,
    key: K,
}

impl<K: Eq + Hash> Drop for Permit<K> {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.key);
    }
}
