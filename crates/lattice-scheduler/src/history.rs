//! In-memory skip history store.

use async_trait::async_trait;
use lattice_core::Result;
use lattice_core::fingerprint::Fingerprint;
use lattice_core::ports::HistoryStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local history store.
///
/// `record` overwrites unconditionally, which gives last-writer-wins
/// per key when concurrent runs of the same combination complete.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<String, Fingerprint>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn lookup(&self, key: &str) -> Result<Option<Fingerprint>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn record(&self, key: &str, fingerprint: &Fingerprint) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), fingerprint.clone());
        Ok(())
    }
}
