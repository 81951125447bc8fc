//! Shell-based task execution on the host.

use crate::runner::{Invocation, OutputLine, OutputStream, RunnerConfig, TaskResult, TaskRunner};
use async_trait::async_trait;
use lattice_core::{Error, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};

/// Task runner that executes invocations with `sh -c` on the host.
pub struct ShellRunner {
    config: RunnerConfig,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl TaskRunner for ShellRunner {
    async fn invoke(
        &self,
        invocation: &Invocation,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult> {
        let start = std::time::Instant::now();

        info!(
            command = %invocation.run,
            workspace = %invocation.workspace.display(),
            "Executing shell command"
        );

        let mut env_vars: HashMap<String, String> = std::env::vars().collect();
        env_vars.extend(invocation.env.clone());

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&invocation.run)
            .current_dir(&invocation.workspace)
            .envs(&env_vars)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The job runner abandons this future on cancellation; the
            // child must not outlive it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::StepInvocation(format!("Failed to spawn process: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::StepInvocation("No stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::StepInvocation("No stderr handle".to_string()))?;

        let stdout_tx = output_tx.clone();
        let stdout_handle = tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = OutputLine {
                    stream: OutputStream::Stdout,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stdout_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        let stderr_tx = output_tx;
        let stderr_handle = tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = OutputLine {
                    stream: OutputStream::Stderr,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stderr_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        let wait_result = if let Some(timeout_secs) = self.config.timeout_seconds {
            match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs, "Command timed out, killing process");
                    let _ = child.kill().await;
                    return Err(Error::StepInvocation("Command timed out".to_string()));
                }
            }
        } else {
            child.wait().await
        };

        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        let status = wait_result
            .map_err(|e| Error::StepInvocation(format!("Failed to wait for process: {}", e)))?;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(exit_code, duration_ms, "Command completed");

        Ok(TaskResult {
            exit_code,
            success: exit_code == 0,
            duration_ms,
        })
    }
}
