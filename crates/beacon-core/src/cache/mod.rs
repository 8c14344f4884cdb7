//! Tiered cache for API payloads
//!
//! Entries are keyed by namespace version, scope and a logical key, carry a
//! per-entry TTL, and live in up to three tiers:
//!
//! - **hot**: an in-process LRU map consulted first
//! - **local**: the bounded synchronous store, for entries below the size limit
//! - **overflow**: the asynchronous store, for everything larger
//!
//! Persistent-tier failures never reach callers; the cache degrades to
//! memory-only and counts the failure.

pub mod key;
pub mod tiered;
pub mod types;


pub use key::{CacheKey, KeySpace, Scope};
pub use tiered::TieredCache;
pub use types::{CacheEntry, CacheOptions, CacheStatistics};
