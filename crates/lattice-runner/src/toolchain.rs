//! Toolchain provisioner adapters.

use crate::runner::{Invocation, OutputLine, TaskResult, TaskRunner, ToolchainProvisioner};
use async_trait::async_trait;
use lattice_core::interpolation::InterpolationContext;
use lattice_core::job::JobSpec;
use lattice_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Provisioner for jobs that need no toolchain setup.
pub struct NoopProvisioner;

#[async_trait]
impl ToolchainProvisioner for NoopProvisioner {
    async fn provision(
        &self,
        _job: &JobSpec,
        _output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult> {
        Ok(TaskResult::ok(0))
    }
}

/// Provisioner that runs the matrix's `toolchain` command through a
/// task runner, interpolated with the job's matrix variables.
pub struct CommandProvisioner {
    runner: Arc<dyn TaskRunner>,
    variables: HashMap<String, String>,
    workspace: PathBuf,
}

impl CommandProvisioner {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        variables: HashMap<String, String>,
        workspace: PathBuf,
    ) -> Self {
        Self {
            runner,
            variables,
            workspace,
        }
    }
}

#[async_trait]
impl ToolchainProvisioner for CommandProvisioner {
    async fn provision(
        &self,
        job: &JobSpec,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult> {
        let Some(command) = &job.toolchain else {
            return Ok(TaskResult::ok(0));
        };

        let ctx = InterpolationContext::for_job(&self.variables, &job.variables);
        let invocation = Invocation {
            run: ctx.interpolate(command),
            env: HashMap::new(),
            workspace: self.workspace.clone(),
        };

        info!(job = %job.display_name, command = %invocation.run, "Provisioning toolchain");
        self.runner
            .invoke(&invocation, output_tx)
            .await
            .map_err(|e| Error::Provisioning(e.to_string()))
    }
}
