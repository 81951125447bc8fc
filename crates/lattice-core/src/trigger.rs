//! Trigger context supplied once per pipeline invocation.

use crate::fingerprint::Fingerprint;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Push,
    PullRequest,
}

/// Read-only description of the event that started this pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriggerContext {
    pub kind: TriggerKind,
    pub branch: Option<String>,
    pub changed_paths: Vec<String>,
    /// Content identity of the input set (file hashes, branch ref).
    pub fingerprint: Fingerprint,
}
