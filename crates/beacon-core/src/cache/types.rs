//! Cache types and data structures

use super::key::Scope;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached payload with its timing metadata
///
/// Serialized as `{"data", "storedAt", "expiresAt", "ttl"}` with epoch
/// milliseconds, which is the on-disk format of both persistent tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub stored_at: i64,
    pub expires_at: i64,
    pub ttl: u64,
}

impl CacheEntry {
    /// Create an entry stored at `now_ms`; `expires_at == stored_at + ttl`
    pub fn new(data: serde_json::Value, ttl: Duration, now_ms: i64) -> Self {
        let ttl_ms = duration_ms(ttl);
        Self {
            data,
            stored_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms as i64),
            ttl: ttl_ms,
        }
    }

    /// Expiry seen by a read; an override can only bring it forward
    pub fn effective_expiry(&self, override_ttl: Option<Duration>) -> i64 {
        match override_ttl {
            Some(ttl) => self
                .expires_at
                .min(self.stored_at.saturating_add(duration_ms(ttl) as i64)),
            None => self.expires_at,
        }
    }

    pub fn is_expired_at(&self, now_ms: i64, override_ttl: Option<Duration>) -> bool {
        now_ms >= self.effective_expiry(override_ttl)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX / 2)
}

/// Per-call cache options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL for writes; on reads it may only shorten an entry's life
    pub ttl: Option<Duration>,
    /// Scope to use instead of the active one
    pub scope: Option<Scope>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hot_hits: u64,
    pub local_hits: u64,
    pub overflow_hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// Entries dropped because they had expired or could not be decoded
    pub evictions: u64,
    /// Persistent-tier failures that were absorbed
    pub storage_failures: u64,
    pub hot_entries: usize,
}

impl CacheStatistics {
    pub fn total_hits(&self) -> u64 {
        self.hot_hits + self.local_hits + self.overflow_hits
    }

    /// Hit rate in `[0, 1]`; zero when nothing was read
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.total_hits() as f64 / total as f64
        }
    }
}
