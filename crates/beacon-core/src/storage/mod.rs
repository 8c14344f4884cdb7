//! Persistent storage tiers
//!
//! Two small backend traits sit under the tiered cache and the session mirror:
//!
//! - [`SyncStore`]: a size-limited synchronous key/value store
//!   ([`BoundedStore`]), readable without awaiting.
//! - [`AsyncStore`]: an unlimited asynchronous store ([`DiskStore`], or
//!   [`MemoryStore`] when nothing is persisted).
//!
//! Every failure is a [`StorageError`]; callers decide whether to absorb it.

mod bounded;
mod disk;
mod memory;


pub use bounded::{BoundedStore, DEFAULT_LOCAL_QUOTA_BYTES};
pub use disk::DiskStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Storage backend errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Whether the failure was the quota being hit
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// Synchronous, size-limited key/value storage
pub trait SyncStore: Send + Sync + Debug {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// All stored keys, in no particular order
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Asynchronous key/value storage without a size limit
#[async_trait]
pub trait AsyncStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value; the write is all-or-nothing
    async fn put(&self, key: &str, value: String) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}

pub type SharedSyncStore = Arc<dyn SyncStore>;
pub type SharedAsyncStore = Arc<dyn AsyncStore>;
