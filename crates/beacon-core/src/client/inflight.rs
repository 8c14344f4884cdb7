//! Deduplication of concurrent identical reads

use crate::error::BeaconResult;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A pending fetch that any number of callers can await
pub type SharedFetch = Shared<BoxFuture<'static, BeaconResult<serde_json::Value>>>;

/// Pending reads keyed by rendered cache key
///
/// Every registration gets a fresh generation number. Removal and the
/// "still current" check compare generations, so a fetch that outlives a
/// [`reset`](Self::reset) can neither remove nor be mistaken for its
/// successor.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    entries: Mutex<HashMap<String, (u64, SharedFetch)>>,
    next_generation: AtomicU64,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending fetch for `key`, or start one built by `start`
    ///
    /// `start` receives the generation of the new registration. Returns the
    /// shared fetch and whether an existing one was joined.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce(u64) -> BoxFuture<'static, BeaconResult<serde_json::Value>>,
    {
        let mut entries = self.entries.lock();
        if let Some((_, pending)) = entries.get(key) {
            return (pending.clone(), true);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = start(generation).shared();
        entries.insert(key.to_string(), (generation, pending.clone()));
        (pending, false)
    }

    /// Whether `generation` is still the registration for `key`
    pub fn is_current(&self, key: &str, generation: u64) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|(current, _)| *current == generation)
    }

    /// Remove `key` if it is still registered under `generation`
    pub fn settle(&self, key: &str, generation: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|(current, _)| *current == generation) {
            entries.remove(key);
        }
    }

    /// Forget every pending fetch; later reads start new ones
    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
