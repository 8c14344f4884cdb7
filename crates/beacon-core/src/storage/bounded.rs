//! Quota-limited synchronous store

use super::{StorageError, SyncStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default quota of a [`BoundedStore`]
pub const DEFAULT_LOCAL_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Synchronous store with a hard byte quota
///
/// Usage counts the bytes of every key plus its value. When opened with a
/// file the whole map is rewritten atomically after each mutation.
#[derive(Debug)]
pub struct BoundedStore {
    inner: Option<Mutex<BoundedInner>>,
}

#[derive(Debug)]
struct BoundedInner {
    items: BTreeMap<String, String>,
    used: usize,
    quota: usize,
    file: Option<PathBuf>,
}

impl BoundedStore {
    /// In-memory store that lives as long as the value
    pub fn in_memory(quota: usize) -> Self {
        Self {
            inner: Some(Mutex::new(BoundedInner {
                items: BTreeMap::new(),
                used: 0,
                quota,
                file: None,
            })),
        }
    }

    /// Open a file-backed store, loading any existing contents
    pub fn open(path: impl AsRef<Path>, quota: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let items: BTreeMap<String, String> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        let used = items.iter().map(|(k, v)| entry_size(k, v)).sum();

        tracing::debug!(
            "Opened bounded store at {} ({} entries, {} bytes)",
            path.display(),
            items.len(),
            used
        );

        Ok(Self {
            inner: Some(Mutex::new(BoundedInner {
                items,
                used,
                quota,
                file: Some(path),
            })),
        })
    }

    /// A store whose every operation fails with [`StorageError::Unavailable`]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Bytes currently used
    pub fn used_bytes(&self) -> usize {
        self.inner.as_ref().map(|m| m.lock().used).unwrap_or(0)
    }

    pub fn quota_bytes(&self) -> usize {
        self.inner.as_ref().map(|m| m.lock().quota).unwrap_or(0)
    }

    fn inner(&self) -> Result<&Mutex<BoundedInner>, StorageError> {
        self.inner
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("local storage is disabled".to_string()))
    }
}

impl BoundedInner {
    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&self.items)
            .map_err(|e| StorageError::Io(format!("Failed to serialize store: {}", e)))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl SyncStore for BoundedStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner()?.lock().items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner()?.lock();

        let previous = inner.items.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        let needed = entry_size(key, value);
        let after = inner.used - previous + needed;
        if after > inner.quota {
            return Err(StorageError::QuotaExceeded {
                needed,
                available: inner.quota.saturating_sub(inner.used - previous),
            });
        }

        let old = inner.items.insert(key.to_string(), value.to_string());
        inner.used = after;

        if let Err(e) = inner.persist() {
            match old {
                Some(old) => {
                    inner.used = inner.used - needed + entry_size(key, &old);
                    inner.items.insert(key.to_string(), old);
                }
                None => {
                    inner.items.remove(key);
                    inner.used -= needed;
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner()?.lock();
        if let Some(old) = inner.items.remove(key) {
            inner.used -= entry_size(key, &old);
            inner.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.inner()?.lock().items.keys().cloned().collect())
    }
}
