//! Run-scoped memoization for expensive external calls.
//!
//! A `MemoCache` belongs to whichever component makes the call (for example
//! [`crate::users::VerifiedUsers`]) and lives exactly as long as it does.
//! There is no process-wide cache.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;

/// Maps an argument key (a single value or a tuple) to a previously computed
/// result. Failed computations are not stored, so they are retried on the
/// next call.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    entries: RefCell<HashMap<K, V>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(value.clone());
        }
        self.misses.set(self.misses.get() + 1);
        // `compute` may re-enter the cache; no borrow is held across it.
        let value = compute()?;
        self.entries.borrow_mut().insert(key, value.clone());
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits.get(), self.misses.get())
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
