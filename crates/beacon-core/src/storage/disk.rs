//! File-per-key asynchronous store

use super::{AsyncStore, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    value: String,
}

/// Disk-backed [`AsyncStore`]
///
/// Each key lives in its own `<sha256(key)>.json` file holding the original
/// key next to the value. Writes go to a temporary file that is renamed into
/// place, so readers never observe a partial record.
#[derive(Debug)]
pub struct DiskStore {
    base_dir: PathBuf,
    index: Mutex<HashMap<String, PathBuf>>,
    write_seq: AtomicU64,
}

impl DiskStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        if !base_dir.exists() {
            std::fs::create_dir_all(&base_dir).map_err(|e| {
                StorageError::Io(format!("Failed to create store directory: {}", e))
            })?;
        }

        Ok(Self {
            base_dir,
            index: Mutex::new(HashMap::new()),
            write_seq: AtomicU64::new(0),
        })
    }

    /// Rebuild the key index by scanning the directory
    ///
    /// Leftover temporary files are removed; unreadable records are skipped.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        let mut found = HashMap::new();
        let mut dir = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to read store directory: {}", e)))?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            match path.extension().and_then(|s| s.to_str()) {
                Some("json") => match read_record(&path).await {
                    Ok(Some(record)) => {
                        found.insert(record.key, path);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
                },
                Some("tmp") => {
                    let _ = fs::remove_file(&path).await;
                }
                _ => {}
            }
        }

        tracing::debug!(
            "Indexed {} records in {}",
            found.len(),
            self.base_dir.display()
        );
        *self.index.lock() = found;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.base_dir.join(format!("{:x}.json", digest))
    }
}

async fn read_record(path: &Path) -> Result<Option<Record>, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl AsyncStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key);
        match read_record(&path).await? {
            Some(record) if record.key == key => Ok(Some(record.value)),
            Some(record) => Err(StorageError::Corrupt(format!(
                "record {} holds key '{}', expected '{}'",
                path.display(),
                record.key,
                key
            ))),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.record_path(key);
        let record = Record {
            key: key.to_string(),
            value,
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| StorageError::Io(format!("Failed to serialize record: {}", e)))?;

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.tmp", seq));
        if let Err(e) = fs::write(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        self.index.lock().insert(key.to_string(), path);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.index.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.index.lock().keys().cloned().collect())
    }
}
