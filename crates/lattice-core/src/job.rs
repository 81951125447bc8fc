//! Expanded job specifications and execution results.

use crate::fingerprint::Fingerprint;
use crate::ids::JobId;
use crate::pipeline::{JobPolicy, StepDefinition, Variant};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One fully-resolved combination of axis variants plus its step
/// sequence and policy. Immutable once expanded.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSpec {
    pub id: JobId,
    /// Name of the matrix this job was expanded from.
    pub matrix: String,
    pub display_name: String,
    /// The chosen variant per axis, in axis declaration order.
    pub selection: IndexMap<String, Variant>,
    /// Variant records merged into one variable set.
    pub variables: IndexMap<String, serde_json::Value>,
    pub policy: JobPolicy,
    pub fail_fast: bool,
    pub toolchain: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl JobSpec {
    /// Stable identity of the axis-variant combination, used to look
    /// up prior successful runs of an equivalent job. Record keys in
    /// variant values are serialized in sorted order, so the key is
    /// canonical.
    pub fn history_key(&self) -> String {
        let parts: Vec<String> = self
            .selection
            .iter()
            .map(|(axis, variant)| {
                let value = serde_json::to_string(&variant.0).unwrap_or_default();
                format!("{}={}", axis, value)
            })
            .collect();
        format!("{}::{}", self.matrix, parts.join(","))
    }
}

/// Terminal and intermediate states of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Cancelled,
}

impl JobStatus {
    /// A passing state for verdict purposes.
    pub fn is_passing(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotRun,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn not_run(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::NotRun,
            exit_code: None,
            duration_ms: 0,
        }
    }
}

/// Immutable record of a job's execution, published on termination.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobResult {
    pub job_id: JobId,
    pub matrix: String,
    pub display_name: String,
    pub policy: JobPolicy,
    pub status: JobStatus,
    pub steps: Vec<StepOutcome>,
    pub duration_ms: u64,
}

impl JobResult {
    /// Whether this result can flip the pipeline verdict to failure.
    pub fn affects_verdict(&self) -> bool {
        self.policy == JobPolicy::Required && !self.status.is_passing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVerdict {
    Success,
    Failure,
}

impl PipelineVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineVerdict::Success)
    }

    /// Process exit status for this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineVerdict::Success => 0,
            PipelineVerdict::Failure => 1,
        }
    }
}

/// Outcome of the skip decision for one job, computed once at
/// dispatch time against the trigger's fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipDecision {
    pub skip: bool,
    pub fingerprint: Fingerprint,
}

impl SkipDecision {
    pub fn run(fingerprint: Fingerprint) -> Self {
        Self {
            skip: false,
            fingerprint,
        }
    }

    pub fn skip(fingerprint: Fingerprint) -> Self {
        Self {
            skip: true,
            fingerprint,
        }
    }
}
