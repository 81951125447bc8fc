//! Job dispatch: bounded fan-out, fail-fast cancellation, history
//! recording.

use crate::skip::SkipDecider;
use lattice_core::job::{JobResult, JobSpec, JobStatus, SkipDecision};
use lattice_core::{Result, RunId};
use lattice_core::pipeline::JobPolicy;
use lattice_core::ports::HistoryStore;
use lattice_core::trigger::TriggerContext;
use lattice_runner::job::JobRunner;
use lattice_runner::runner::{OutputLine, TaskRunner, ToolchainProvisioner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Dispatch configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of jobs in flight at once.
    pub max_parallel: usize,
    pub workspace: PathBuf,
    /// Pipeline-level variables available to step interpolation.
    pub variables: HashMap<String, String>,
}

/// Launches job runners up to the concurrency limit and collects
/// their terminal results.
///
/// Jobs run to completion independently by default. When a required
/// job with `fail_fast` fails, remaining required jobs are cancelled;
/// best-effort jobs are never cancelled by that mechanism.
pub struct Dispatcher {
    runner: Arc<dyn TaskRunner>,
    provisioner: Arc<dyn ToolchainProvisioner>,
    history: Arc<dyn HistoryStore>,
    skip_decider: Arc<SkipDecider>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        provisioner: Arc<dyn ToolchainProvisioner>,
        history: Arc<dyn HistoryStore>,
        skip_decider: SkipDecider,
        config: DispatchConfig,
    ) -> Self {
        Self {
            runner,
            provisioner,
            history,
            skip_decider: Arc::new(skip_decider),
            config,
        }
    }

    /// Run every job spec to a terminal state and return results in
    /// expansion order.
    pub async fn run(
        &self,
        specs: Vec<JobSpec>,
        ctx: &TriggerContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<Vec<JobResult>> {
        let run_id = RunId::new();
        info!(
            run = %run_id,
            jobs = specs.len(),
            max_parallel = self.config.max_parallel,
            trigger = ?ctx.kind,
            "Dispatching pipeline"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        // Best-effort jobs get a receiver that never signals.
        let (_quiet_tx, quiet_rx) = watch::channel(false);

        let mut join_set: JoinSet<(usize, JobResult)> = JoinSet::new();

        for (index, spec) in specs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let provisioner = self.provisioner.clone();
            let history = self.history.clone();
            let skip_decider = self.skip_decider.clone();
            let ctx = ctx.clone();
            let output_tx = output_tx.clone();
            let cancel_tx = cancel_tx.clone();
            let cancel_rx = if spec.policy == JobPolicy::Required {
                cancel_rx.clone()
            } else {
                quiet_rx.clone()
            };
            let variables = self.config.variables.clone();
            let workspace = self.config.workspace.clone();

            join_set.spawn(async move {
                // Queue until a slot frees.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // Semaphore never closes while the dispatcher
                        // is running; treat defensively as cancelled.
                        return (index, cancelled_result(&spec));
                    }
                };

                // Skip decision is computed at dispatch time, once per
                // job, unless the job was already cancelled.
                let decision = if *cancel_rx.borrow() {
                    SkipDecision::run(ctx.fingerprint.clone())
                } else {
                    skip_decider.should_skip(&spec, &ctx).await
                };

                let key = spec.history_key();
                let fail_fast = spec.fail_fast;
                let policy = spec.policy;

                let job = JobRunner::new(
                    spec,
                    decision,
                    runner,
                    provisioner,
                    variables,
                    workspace,
                    cancel_rx,
                    output_tx,
                );
                let result = job.run().await;

                match result.status {
                    JobStatus::Succeeded => {
                        // Authoritative for future skip decisions:
                        // recorded on completion, last writer wins.
                        if let Err(e) = history.record(&key, &ctx.fingerprint).await {
                            warn!(job = %result.display_name, error = %e, "Failed to record run fingerprint");
                        }
                    }
                    JobStatus::Failed if policy == JobPolicy::Required && fail_fast => {
                        info!(job = %result.display_name, "Required job failed, cancelling siblings");
                        let _ = cancel_tx.send(true);
                    }
                    _ => {}
                }

                (index, result)
            });
        }

        let mut results: Vec<Option<JobResult>> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if results.len() <= index {
                        results.resize_with(index + 1, || None);
                    }
                    results[index] = Some(result);
                }
                Err(e) => {
                    error!(error = %e, "Job task panicked");
                    return Err(lattice_core::Error::Internal(format!(
                        "job task failed: {}",
                        e
                    )));
                }
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}

fn cancelled_result(spec: &JobSpec) -> JobResult {
    JobResult {
        job_id: spec.id,
        matrix: spec.matrix.clone(),
        display_name: spec.display_name.clone(),
        policy: spec.policy,
        status: JobStatus::Cancelled,
        steps: spec
            .steps
            .iter()
            .map(|s| lattice_core::job::StepOutcome::not_run(&s.name))
            .collect(),
        duration_ms: 0,
    }
}
