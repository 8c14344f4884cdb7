//! Purging and sweeping

use super::TieredCache;
use crate::cache::key::Scope;
use crate::cache::types::{CacheEntry, CacheOptions};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tracing::debug;

impl TieredCache {
    /// Remove expired or unreadable cache entries from the local tier
    pub(super) fn prune_local(&self) -> Vec<String> {
        let keys = match self.local.keys() {
            Ok(keys) => keys,
            Err(e) => {
                self.record_failure("list local", self.keys.prefix(), &e);
                return Vec::new();
            }
        };

        let now = self.now_ms();
        let mut removed = Vec::new();
        for key in keys.into_iter().filter(|k| self.keys.owns(k)) {
            let stale = match self.local.get_item(&key) {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw)
                    .map(|entry| entry.is_expired_at(now, None))
                    .unwrap_or(true),
                _ => false,
            };
            if stale && self.local.remove_item(&key).is_ok() {
                self.hot.lock().pop(&key);
                removed.push(key);
            }
        }
        removed
    }

    /// Remove one key under the active scope from every tier
    pub async fn invalidate(&self, key: &str) {
        let storage_key = self.storage_key(key, &CacheOptions::default());
        self.evict_sync_tiers(&storage_key);
        if let Err(e) = self.overflow.delete(&storage_key).await {
            self.record_failure("delete overflow", &storage_key, &e);
        }
    }

    /// Remove every key starting with `prefix` under one scope
    ///
    /// Uses the active scope when `scope` is `None`. Returns the number of
    /// distinct keys removed.
    pub async fn invalidate_by_prefix(&self, prefix: &str, scope: Option<&Scope>) -> usize {
        let full_prefix = match scope {
            Some(scope) => self.keys.render(scope, prefix),
            None => self.keys.render(&self.scope.read(), prefix),
        };
        let removed = self.remove_matching(|k| k.starts_with(&full_prefix)).await;
        debug!("Invalidated {} entries under {}", removed, full_prefix);
        removed
    }

    /// Remove every entry of this cache in every tier, scope and version
    pub async fn clear_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let removed = self.remove_matching(|k| self.keys.owns(k)).await;
        debug!("Cleared {} cache entries", removed);
    }

    async fn remove_matching<F>(&self, matches: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut removed = HashSet::new();

        {
            let mut hot = self.hot.lock();
            let doomed: Vec<String> = hot
                .iter()
                .filter(|(k, _)| matches(k.as_str()))
                .map(|(k, _)| k.clone())
                .collect();
            for key in doomed {
                hot.pop(&key);
                removed.insert(key);
            }
        }

        match self.local.keys() {
            Ok(keys) => {
                for key in keys.into_iter().filter(|k| matches(k.as_str())) {
                    match self.local.remove_item(&key) {
                        Ok(()) => {
                            removed.insert(key);
                        }
                        Err(e) => self.record_failure("delete local", &key, &e),
                    }
                }
            }
            Err(e) => self.record_failure("list local", self.keys.prefix(), &e),
        }

        match self.overflow.keys().await {
            Ok(keys) => {
                for key in keys.into_iter().filter(|k| matches(k.as_str())) {
                    match self.overflow.delete(&key).await {
                        Ok(()) => {
                            removed.insert(key);
                        }
                        Err(e) => self.record_failure("delete overflow", &key, &e),
                    }
                }
            }
            Err(e) => self.record_failure("list overflow", self.keys.prefix(), &e),
        }

        removed.len()
    }

    /// Sweep every tier for expired entries; returns how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.now_ms();

        let mut removed: HashSet<String> = {
            let mut hot = self.hot.lock();
            let expired: Vec<String> = hot
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now, None))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                hot.pop(key);
            }
            expired.into_iter().collect()
        };

        removed.extend(self.prune_local());

        match self.overflow.keys().await {
            Ok(keys) => {
                for key in keys.into_iter().filter(|k| self.keys.owns(k)) {
                    let stale = match self.overflow.get(&key).await {
                        Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw)
                            .map(|entry| entry.is_expired_at(now, None))
                            .unwrap_or(true),
                        _ => false,
                    };
                    if stale && self.overflow.delete(&key).await.is_ok() {
                        removed.insert(key);
                    }
                }
            }
            Err(e) => self.record_failure("list overflow", self.keys.prefix(), &e),
        }

        self.stats.lock().evictions += removed.len() as u64;
        removed.len()
    }
}
