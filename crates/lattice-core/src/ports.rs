//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the orchestrator core
//! and external collaborators.

use crate::Result;
use crate::fingerprint::Fingerprint;
use async_trait::async_trait;

/// Store of the most recent successful fingerprint per job
/// equivalence key.
///
/// Implementations must be last-writer-wins per key under concurrent
/// successful completions; a `record` for a run that finished later
/// overwrites the earlier one.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Look up the fingerprint of the last successful run for a key.
    async fn lookup(&self, key: &str) -> Result<Option<Fingerprint>>;

    /// Record a successful completion for a key.
    async fn record(&self, key: &str, fingerprint: &Fingerprint) -> Result<()>;
}
