//! Core runner traits and types.

use async_trait::async_trait;
use lattice_core::Result;
use lattice_core::job::JobSpec;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line from a step invocation.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub content: String,
    pub line_number: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Result of one task invocation.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn ok(duration_ms: u64) -> Self {
        Self {
            exit_code: 0,
            success: true,
            duration_ms,
        }
    }
}

/// Opaque invocation descriptor handed to the task runner.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub run: String,
    pub env: HashMap<String, String>,
    pub workspace: PathBuf,
}

/// External task runner collaborator.
///
/// Must be callable repeatedly and concurrently; the orchestrator
/// assumes no shared mutable state between invocations.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Execute an invocation, streaming output to the provided channel.
    async fn invoke(
        &self,
        invocation: &Invocation,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult>;
}

/// External toolchain provisioner collaborator, invoked once per job
/// before its first step. A failure here is treated identically to a
/// failed first step.
#[async_trait]
pub trait ToolchainProvisioner: Send + Sync {
    async fn provision(
        &self,
        job: &JobSpec,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult>;
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub timeout_seconds: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: Some(3600), // 1 hour default
        }
    }
}
