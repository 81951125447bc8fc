//! File-backed skip history store.

use async_trait::async_trait;
use lattice_core::fingerprint::Fingerprint;
use lattice_core::ports::HistoryStore;
use lattice_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// History store persisted as a JSON map next to the workspace.
///
/// The whole file is rewritten on every record; the map is small (one
/// entry per axis combination) and this keeps the on-disk state
/// consistent without a write-ahead log.
pub struct FileHistoryStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, Fingerprint>>,
}

impl FileHistoryStore {
    /// Open the store, loading any existing entries. A missing file is
    /// an empty history, not an error.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Serialization(format!("history file {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(Error::HistoryUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )));
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened history store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn lookup(&self, key: &str) -> Result<Option<Fingerprint>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn record(&self, key: &str, fingerprint: &Fingerprint) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), fingerprint.clone());

        let json = serde_json::to_vec_pretty(&*entries)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        // Held across the write so concurrent records serialize and the
        // last writer's file matches its map.
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::HistoryUnavailable(e.to_string()))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| Error::HistoryUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lattice").join("history.json");
        let fp = Fingerprint::from_hex("abc123");

        let store = FileHistoryStore::open(path.clone()).unwrap();
        store.record("ci::os=\"linux\"", &fp).await.unwrap();

        let reopened = FileHistoryStore::open(path).unwrap();
        assert_eq!(
            reopened.lookup("ci::os=\"linux\"").await.unwrap(),
            Some(fp)
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::open(dir.path().join("history.json")).unwrap();
        assert_eq!(store.lookup("any").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(FileHistoryStore::open(path).is_err());
    }
}
