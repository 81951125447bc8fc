//! Per-job state machine.
//!
//! Drives one job's step sequence: skip short-circuit, toolchain
//! provisioning, gate evaluation, the strict linear AND-chain, and
//! cooperative cancellation.

use crate::runner::{Invocation, OutputLine, TaskRunner, ToolchainProvisioner};
use lattice_core::interpolation::InterpolationContext;
use lattice_core::job::{JobResult, JobSpec, JobStatus, SkipDecision, StepOutcome, StepStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Runs a single job to a terminal status.
///
/// Owns its step outcomes and publishes an immutable [`JobResult`] on
/// termination. All I/O is delegated to the task runner and
/// provisioner collaborators.
pub struct JobRunner {
    spec: JobSpec,
    skip: SkipDecision,
    runner: Arc<dyn TaskRunner>,
    provisioner: Arc<dyn ToolchainProvisioner>,
    variables: HashMap<String, String>,
    workspace: PathBuf,
    cancel: watch::Receiver<bool>,
    output_tx: mpsc::Sender<OutputLine>,
}

impl JobRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: JobSpec,
        skip: SkipDecision,
        runner: Arc<dyn TaskRunner>,
        provisioner: Arc<dyn ToolchainProvisioner>,
        variables: HashMap<String, String>,
        workspace: PathBuf,
        cancel: watch::Receiver<bool>,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Self {
        Self {
            spec,
            skip,
            runner,
            provisioner,
            variables,
            workspace,
            cancel,
            output_tx,
        }
    }

    /// Drive the job to a terminal status.
    pub async fn run(self) -> JobResult {
        let start = std::time::Instant::now();

        // Skip verdict makes every gate false: terminal without
        // invoking any collaborator.
        if self.skip.skip {
            info!(job = %self.spec.display_name, "Job skipped (prior identical run succeeded)");
            return self.finish(
                JobStatus::Skipped,
                self.all_not_run(),
                start.elapsed().as_millis() as u64,
            );
        }

        if *self.cancel.borrow() {
            return self.finish(JobStatus::Cancelled, self.all_not_run(), 0);
        }

        info!(job = %self.spec.display_name, steps = self.spec.steps.len(), "Job started");

        let ctx = InterpolationContext::for_job(&self.variables, &self.spec.variables);
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(self.spec.steps.len() + 1);

        // Toolchain provisioning runs before the first step; a failure
        // is recorded as a failed synthetic first step.
        match self
            .provisioner
            .provision(&self.spec, self.output_tx.clone())
            .await
        {
            Ok(result) if result.success => {}
            Ok(result) => {
                warn!(job = %self.spec.display_name, exit_code = result.exit_code, "Toolchain provisioning failed");
                outcomes.push(StepOutcome {
                    name: "toolchain".to_string(),
                    status: StepStatus::Failed,
                    exit_code: Some(result.exit_code),
                    duration_ms: result.duration_ms,
                });
                outcomes.extend(self.all_not_run());
                return self.finish(
                    JobStatus::Failed,
                    outcomes,
                    start.elapsed().as_millis() as u64,
                );
            }
            Err(e) => {
                warn!(job = %self.spec.display_name, error = %e, "Toolchain provisioning could not be invoked");
                outcomes.push(StepOutcome {
                    name: "toolchain".to_string(),
                    status: StepStatus::Failed,
                    exit_code: None,
                    duration_ms: 0,
                });
                outcomes.extend(self.all_not_run());
                return self.finish(
                    JobStatus::Failed,
                    outcomes,
                    start.elapsed().as_millis() as u64,
                );
            }
        }

        let mut failed = false;
        let mut cancelled = false;

        for step in &self.spec.steps {
            if cancelled || *self.cancel.borrow() {
                cancelled = true;
                outcomes.push(StepOutcome::not_run(&step.name));
                continue;
            }

            // Short-circuit: once a gated-true step has failed, later
            // steps never run, regardless of their own gates.
            if failed {
                outcomes.push(StepOutcome::not_run(&step.name));
                continue;
            }

            if !step.gate_matches(&self.spec.variables) {
                debug!(job = %self.spec.display_name, step = %step.name, "Gate false, step not run");
                outcomes.push(StepOutcome::not_run(&step.name));
                continue;
            }

            let invocation = Invocation {
                run: ctx.interpolate(&step.run),
                env: step
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), ctx.interpolate(v)))
                    .collect(),
                workspace: self.workspace.clone(),
            };

            let mut cancel_rx = self.cancel.clone();
            let invoke = self.runner.invoke(&invocation, self.output_tx.clone());
            tokio::pin!(invoke);

            let result = loop {
                tokio::select! {
                    res = &mut invoke => break Some(res),
                    changed = cancel_rx.changed() => {
                        match changed {
                            Ok(()) if *cancel_rx.borrow() => break None,
                            Ok(()) => continue,
                            // Sender gone: no cancellation can arrive.
                            Err(_) => break Some(invoke.await),
                        }
                    }
                }
            };

            match result {
                None => {
                    // In-flight invocation abandoned; its exit status,
                    // if it ever arrives, is discarded.
                    info!(job = %self.spec.display_name, step = %step.name, "Cancelled during step");
                    cancelled = true;
                    outcomes.push(StepOutcome::not_run(&step.name));
                }
                Some(Ok(task)) => {
                    let status = if task.success {
                        StepStatus::Succeeded
                    } else {
                        failed = true;
                        StepStatus::Failed
                    };
                    debug!(job = %self.spec.display_name, step = %step.name, exit_code = task.exit_code, "Step finished");
                    outcomes.push(StepOutcome {
                        name: step.name.clone(),
                        status,
                        exit_code: Some(task.exit_code),
                        duration_ms: task.duration_ms,
                    });
                }
                Some(Err(e)) => {
                    warn!(job = %self.spec.display_name, step = %step.name, error = %e, "Step invocation error");
                    failed = true;
                    outcomes.push(StepOutcome {
                        name: step.name.clone(),
                        status: StepStatus::Failed,
                        exit_code: None,
                        duration_ms: 0,
                    });
                }
            }
        }

        let status = if cancelled {
            JobStatus::Cancelled
        } else if failed {
            JobStatus::Failed
        } else {
            JobStatus::Succeeded
        };

        self.finish(status, outcomes, start.elapsed().as_millis() as u64)
    }

    fn all_not_run(&self) -> Vec<StepOutcome> {
        self.spec
            .steps
            .iter()
            .map(|s| StepOutcome::not_run(&s.name))
            .collect()
    }

    fn finish(&self, status: JobStatus, steps: Vec<StepOutcome>, duration_ms: u64) -> JobResult {
        info!(job = %self.spec.display_name, status = ?status, duration_ms, "Job finished");
        JobResult {
            job_id: self.spec.id,
            matrix: self.spec.matrix.clone(),
            display_name: self.spec.display_name.clone(),
            policy: self.spec.policy,
            status,
            steps,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskResult;
    use crate::toolchain::NoopProvisioner;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use lattice_core::fingerprint::Fingerprint;
    use lattice_core::ids::JobId;
    use lattice_core::pipeline::{JobPolicy, StepDefinition, Variant};
    use std::sync::Mutex;

    /// Task runner that maps commands to scripted exit codes and
    /// records which commands were invoked.
    struct ScriptedRunner {
        exit_codes: HashMap<String, i32>,
        invoked: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(exit_codes: &[(&str, i32)]) -> Self {
            Self {
                exit_codes: exit_codes
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                invoked: Mutex::new(vec![]),
            }
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskRunner for ScriptedRunner {
        async fn invoke(
            &self,
            invocation: &Invocation,
            _output_tx: mpsc::Sender<OutputLine>,
        ) -> lattice_core::Result<TaskResult> {
            self.invoked.lock().unwrap().push(invocation.run.clone());
            let exit_code = self.exit_codes.get(&invocation.run).copied().unwrap_or(0);
            Ok(TaskResult {
                exit_code,
                success: exit_code == 0,
                duration_ms: 1,
            })
        }
    }

    fn step(name: &str) -> StepDefinition {
        StepDefinition {
            name: name.to_string(),
            run: name.to_string(),
            env: HashMap::new(),
            when: None,
        }
    }

    fn spec(steps: Vec<StepDefinition>) -> JobSpec {
        JobSpec {
            id: JobId::new(),
            matrix: "ci".to_string(),
            display_name: "ci (test)".to_string(),
            selection: IndexMap::new(),
            variables: IndexMap::new(),
            policy: JobPolicy::Required,
            fail_fast: false,
            toolchain: None,
            steps,
        }
    }

    fn harness(
        spec: JobSpec,
        skip: bool,
        runner: Arc<ScriptedRunner>,
    ) -> (JobRunner, watch::Sender<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (output_tx, _output_rx) = mpsc::channel(64);
        let fingerprint = Fingerprint::from_hex("abc");
        let decision = if skip {
            SkipDecision::skip(fingerprint)
        } else {
            SkipDecision::run(fingerprint)
        };
        let runner = JobRunner::new(
            spec,
            decision,
            runner,
            Arc::new(NoopProvisioner),
            HashMap::new(),
            PathBuf::from("/tmp"),
            cancel_rx,
            output_tx,
        );
        (runner, cancel_tx)
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let (job, _cancel) = harness(spec(vec![step("fmt"), step("build"), step("test")]), false, runner.clone());

        let result = job.run().await;
        assert_eq!(result.status, JobStatus::Succeeded);
        assert!(result.steps.iter().all(|s| s.status == StepStatus::Succeeded));
        assert_eq!(runner.invoked(), vec!["fmt", "build", "test"]);
    }

    #[tokio::test]
    async fn test_and_chain_short_circuits() {
        let runner = Arc::new(ScriptedRunner::new(&[("build", 101)]));
        let (job, _cancel) = harness(
            spec(vec![step("fmt"), step("build"), step("test"), step("clippy")]),
            false,
            runner.clone(),
        );

        let result = job.run().await;
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.steps[0].status, StepStatus::Succeeded);
        assert_eq!(result.steps[1].status, StepStatus::Failed);
        assert_eq!(result.steps[1].exit_code, Some(101));
        assert_eq!(result.steps[2].status, StepStatus::NotRun);
        assert_eq!(result.steps[3].status, StepStatus::NotRun);
        // Later steps were never invoked.
        assert_eq!(runner.invoked(), vec!["fmt", "build"]);
    }

    #[tokio::test]
    async fn test_gate_false_does_not_block() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let mut gated = step("cross-build");
        let mut when = IndexMap::new();
        when.insert("cross".to_string(), serde_json::json!(true));
        gated.when = Some(when);

        let mut job_spec = spec(vec![step("fmt"), gated, step("test")]);
        job_spec
            .variables
            .insert("cross".to_string(), serde_json::json!(false));

        let (job, _cancel) = harness(job_spec, false, runner.clone());
        let result = job.run().await;

        assert_eq!(result.status, JobStatus::Succeeded);
        assert_eq!(result.steps[1].status, StepStatus::NotRun);
        assert_eq!(result.steps[2].status, StepStatus::Succeeded);
        assert_eq!(runner.invoked(), vec!["fmt", "test"]);
    }

    #[tokio::test]
    async fn test_skip_invokes_nothing() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let (job, _cancel) = harness(spec(vec![step("fmt"), step("build")]), true, runner.clone());

        let result = job.run().await;
        assert_eq!(result.status, JobStatus::Skipped);
        assert!(result.steps.iter().all(|s| s.status == StepStatus::NotRun));
        assert!(runner.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let runner = Arc::new(ScriptedRunner::new(&[]));
        let (job, cancel) = harness(spec(vec![step("build")]), false, runner.clone());

        cancel.send(true).unwrap();
        let result = job.run().await;
        assert_eq!(result.status, JobStatus::Cancelled);
        assert!(runner.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_failed_first_step() {
        struct FailingProvisioner;

        #[async_trait]
        impl ToolchainProvisioner for FailingProvisioner {
            async fn provision(
                &self,
                _job: &JobSpec,
                _output_tx: mpsc::Sender<OutputLine>,
            ) -> lattice_core::Result<TaskResult> {
                Ok(TaskResult {
                    exit_code: 7,
                    success: false,
                    duration_ms: 3,
                })
            }
        }

        let runner = Arc::new(ScriptedRunner::new(&[]));
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let (output_tx, _output_rx) = mpsc::channel(64);

        let job = JobRunner::new(
            spec(vec![step("build"), step("test")]),
            SkipDecision::run(Fingerprint::from_hex("abc")),
            runner.clone(),
            Arc::new(FailingProvisioner),
            HashMap::new(),
            PathBuf::from("/tmp"),
            cancel_rx,
            output_tx,
        );

        let result = job.run().await;
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.steps[0].name, "toolchain");
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[0].exit_code, Some(7));
        assert!(result.steps[1..].iter().all(|s| s.status == StepStatus::NotRun));
        assert!(runner.invoked().is_empty());
    }
}
