//! Three-tier cache store

use super::key::{KeySpace, Scope};
use super::types::{CacheEntry, CacheOptions, CacheStatistics};
use crate::clock::SharedClock;
use crate::config::CacheConfig;
use crate::storage::{
    BoundedStore, DEFAULT_LOCAL_QUOTA_BYTES, MemoryStore, SharedAsyncStore, SharedSyncStore,
    StorageError,
};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

mod maintenance;

/// Key/value cache with a hot tier over two persistent tiers
///
/// Reads check hot, then local, then (async only) overflow, promoting hits
/// into the hot tier. Writes always land in the hot tier and in exactly one
/// persistent tier chosen by serialized size.
#[derive(Debug)]
pub struct TieredCache {
    keys: KeySpace,
    default_ttl: Duration,
    local_entry_limit: usize,
    hot: Mutex<LruCache<String, CacheEntry>>,
    local: SharedSyncStore,
    overflow: SharedAsyncStore,
    clock: SharedClock,
    scope: RwLock<Scope>,
    stats: Mutex<CacheStatistics>,
    epoch: AtomicU64,
}

enum Lookup {
    Hit(CacheEntry),
    Expired,
    Miss,
}

impl TieredCache {
    /// Create a cache over the given persistent tiers
    pub fn new(
        config: &CacheConfig,
        local: SharedSyncStore,
        overflow: SharedAsyncStore,
        clock: SharedClock,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.hot_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            keys: KeySpace::new(config.key_prefix.clone(), config.namespace_version),
            default_ttl: config.default_ttl(),
            local_entry_limit: config.local_entry_limit_bytes,
            hot: Mutex::new(LruCache::new(capacity)),
            local,
            overflow,
            clock,
            scope: RwLock::new(Scope::anonymous()),
            stats: Mutex::new(CacheStatistics::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Cache whose persistent tiers only live in this process
    pub fn in_memory(config: &CacheConfig, clock: SharedClock) -> Self {
        Self::new(
            config,
            Arc::new(BoundedStore::in_memory(DEFAULT_LOCAL_QUOTA_BYTES)),
            Arc::new(MemoryStore::new()),
            clock,
        )
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    pub fn active_scope(&self) -> Scope {
        self.scope.read().clone()
    }

    /// Incremented by every [`clear_all`](Self::clear_all)
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn set_scope(&self, scope: Scope) {
        debug!("Cache scope set to {}", scope);
        *self.scope.write() = scope;
    }

    /// Rendered storage key for a logical key under the given options
    pub fn storage_key(&self, key: &str, options: &CacheOptions) -> String {
        match &options.scope {
            Some(scope) => self.keys.render(scope, key),
            None => self.keys.render(&self.scope.read(), key),
        }
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Synchronous read of the hot and local tiers
    pub fn get<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        let storage_key = self.storage_key(key, options);
        match self.lookup_sync(&storage_key, options.ttl) {
            Lookup::Hit(entry) => decode(&storage_key, entry),
            Lookup::Expired => {
                self.spawn_overflow_delete(&storage_key);
                self.stats.lock().misses += 1;
                None
            }
            Lookup::Miss => {
                self.stats.lock().misses += 1;
                None
            }
        }
    }

    /// Read every tier, including overflow
    pub async fn get_async<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &CacheOptions,
    ) -> Option<T> {
        let storage_key = self.storage_key(key, options);
        match self.lookup_sync(&storage_key, options.ttl) {
            Lookup::Hit(entry) => return decode(&storage_key, entry),
            Lookup::Expired => {
                if let Err(e) = self.overflow.delete(&storage_key).await {
                    self.record_failure("delete overflow", &storage_key, &e);
                }
                self.stats.lock().misses += 1;
                return None;
            }
            Lookup::Miss => {}
        }

        let raw = match self.overflow.get(&storage_key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.record_failure("read overflow", &storage_key, &e);
                None
            }
        };
        let Some(raw) = raw else {
            self.stats.lock().misses += 1;
            return None;
        };

        let entry = match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired_at(self.now_ms(), options.ttl) => entry,
            _ => {
                debug!("Dropping stale overflow entry {}", storage_key);
                self.evict_sync_tiers(&storage_key);
                if let Err(e) = self.overflow.delete(&storage_key).await {
                    self.record_failure("delete overflow", &storage_key, &e);
                }
                let mut stats = self.stats.lock();
                stats.evictions += 1;
                stats.misses += 1;
                return None;
            }
        };

        // A set that finished while the overflow read was pending owns the hot slot
        let entry = {
            let mut hot = self.hot.lock();
            match hot.get(&storage_key) {
                Some(newer) => newer.clone(),
                None => {
                    hot.put(storage_key.clone(), entry.clone());
                    entry
                }
            }
        };
        debug!("Overflow hit for {}", storage_key);
        self.stats.lock().overflow_hits += 1;
        decode(&storage_key, entry)
    }

    fn lookup_sync(&self, storage_key: &str, override_ttl: Option<Duration>) -> Lookup {
        let now = self.now_ms();

        let hot = self.hot.lock().get(storage_key).cloned();
        if let Some(entry) = hot {
            if entry.is_expired_at(now, override_ttl) {
                self.evict_expired(storage_key);
                return Lookup::Expired;
            }
            debug!("Hot hit for {}", storage_key);
            self.stats.lock().hot_hits += 1;
            return Lookup::Hit(entry);
        }

        let raw = match self.local.get_item(storage_key) {
            Ok(raw) => raw,
            Err(e) => {
                self.record_failure("read local", storage_key, &e);
                None
            }
        };
        let Some(raw) = raw else {
            return Lookup::Miss;
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired_at(now, override_ttl) => {
                debug!("Local hit for {}", storage_key);
                self.stats.lock().local_hits += 1;
                self.hot.lock().put(storage_key.to_string(), entry.clone());
                Lookup::Hit(entry)
            }
            Ok(_) => {
                self.evict_expired(storage_key);
                Lookup::Expired
            }
            Err(e) => {
                warn!("Removing corrupt cache entry {}: {}", storage_key, e);
                self.evict_expired(storage_key);
                Lookup::Expired
            }
        }
    }

    fn evict_expired(&self, storage_key: &str) {
        self.evict_sync_tiers(storage_key);
        self.stats.lock().evictions += 1;
    }

    /// Best-effort overflow removal for the synchronous read path
    ///
    /// Runs detached on the current runtime, if any; a copy that survives is
    /// dropped by the next `get_async` or `cleanup_expired`.
    fn spawn_overflow_delete(&self, storage_key: &str) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let overflow = Arc::clone(&self.overflow);
            let key = storage_key.to_string();
            handle.spawn(async move {
                if let Err(e) = overflow.delete(&key).await {
                    warn!("Failed to delete overflow entry {}: {}", key, e);
                }
            });
        }
    }

    fn evict_sync_tiers(&self, storage_key: &str) {
        self.hot.lock().pop(storage_key);
        if let Err(e) = self.local.remove_item(storage_key) {
            self.record_failure("delete local", storage_key, &e);
        }
    }

    /// Store a value; persistent-tier failures are absorbed
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: &CacheOptions) {
        match serde_json::to_value(value) {
            Ok(data) => self.set_value(key, data, options).await,
            Err(e) => warn!("Not caching {}: value does not serialize: {}", key, e),
        }
    }

    /// Store an already-serialized JSON value
    pub async fn set_value(&self, key: &str, data: serde_json::Value, options: &CacheOptions) {
        self.store(key, data, options, None).await;
    }

    /// Store `data` only if no [`clear_all`](Self::clear_all) ran since
    /// `epoch` was read; returns whether the entry was kept
    ///
    /// A purge that races the write removes the entry again.
    pub async fn set_value_in_epoch(
        &self,
        key: &str,
        data: serde_json::Value,
        options: &CacheOptions,
        epoch: u64,
    ) -> bool {
        self.store(key, data, options, Some(epoch)).await
    }

    async fn store(
        &self,
        key: &str,
        data: serde_json::Value,
        options: &CacheOptions,
        epoch: Option<u64>,
    ) -> bool {
        let storage_key = self.storage_key(key, options);
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(data, ttl, self.now_ms());
        let purged = || epoch.is_some_and(|e| e != self.epoch());

        {
            let mut hot = self.hot.lock();
            if purged() {
                debug!("Cache purged while fetching {}, not storing", storage_key);
                return false;
            }
            hot.put(storage_key.clone(), entry.clone());
        }
        self.stats.lock().writes += 1;

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Keeping {} in memory only: {}", storage_key, e);
                return true;
            }
        };

        if serialized.len() < self.local_entry_limit {
            self.write_local(&storage_key, &serialized);
            if let Err(e) = self.overflow.delete(&storage_key).await {
                self.record_failure("delete overflow", &storage_key, &e);
            }
        } else {
            debug!(
                "Entry {} is {} bytes, writing to overflow",
                storage_key,
                serialized.len()
            );
            if let Err(e) = self.overflow.put(&storage_key, serialized).await {
                self.record_failure("write overflow", &storage_key, &e);
            }
            if let Err(e) = self.local.remove_item(&storage_key) {
                self.record_failure("delete local", &storage_key, &e);
            }
        }

        if purged() {
            self.evict_sync_tiers(&storage_key);
            if let Err(e) = self.overflow.delete(&storage_key).await {
                self.record_failure("delete overflow", &storage_key, &e);
            }
            return false;
        }
        true
    }

    fn write_local(&self, storage_key: &str, serialized: &str) {
        match self.local.set_item(storage_key, serialized) {
            Ok(()) => {}
            Err(e) if e.is_quota_exceeded() => {
                let pruned = self.prune_local();
                debug!("Local quota hit, pruned {} expired entries", pruned.len());
                if let Err(e) = self.local.set_item(storage_key, serialized) {
                    self.record_failure("write local", storage_key, &e);
                }
            }
            Err(e) => self.record_failure("write local", storage_key, &e),
        }
    }

    /// Get cache statistics
    pub fn statistics(&self) -> CacheStatistics {
        let mut stats = self.stats.lock().clone();
        stats.hot_entries = self.hot.lock().len();
        stats
    }

    fn record_failure(&self, action: &str, key: &str, err: &StorageError) {
        warn!("Cache storage failure ({} {}): {}", action, key, err);
        self.stats.lock().storage_failures += 1;
    }
}

fn decode<T: DeserializeOwned>(storage_key: &str, entry: CacheEntry) -> Option<T> {
    match serde_json::from_value(entry.data) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Cached value for {} has a different shape: {}", storage_key, e);
            None
        }
    }
}
