//! Request coalescing keyed by string.
//!
//! At most one lookup is outstanding per key; every concurrent resolver
//! awaiting that key polls the same shared future and observes the same
//! value. The installed future clears its own slot as its final step, so
//! the entry is removed no matter which caller drives it to completion —
//! callers are allowed to drop out mid-await.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

pub(crate) type SharedLookup<T> = Shared<BoxFuture<'static, T>>;

pub(crate) struct InflightTable<T: Clone> {
    pending: Mutex<HashMap<String, SharedLookup<T>>>,
}

impl<T: Clone> InflightTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Join the pending lookup for `key`, or install the one produced by
    /// `make`. Installed futures must call [`Self::clear`] for their key
    /// before resolving.
    pub(crate) fn join_or_insert(
        &self,
        key: &str,
        make: impl FnOnce() -> BoxFuture<'static, T>,
    ) -> SharedLookup<T> {
        let mut pending = lock(&self.pending);
        if let Some(existing) = pending.get(key) {
            return existing.clone();
        }
        let shared = make().shared();
        pending.insert(key.to_string(), shared.clone());
        shared
    }

    pub(crate) fn clear(&self, key: &str) {
        lock(&self.pending).remove(key);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.pending).len()
    }
}

fn lock<'a, T: Clone>(
    pending: &'a Mutex<HashMap<String, SharedLookup<T>>>,
) -> MutexGuard<'a, HashMap<String, SharedLookup<T>>> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
