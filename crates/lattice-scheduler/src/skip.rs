//! Skip/dedup decisions for expanded jobs.

use lattice_core::glob::glob_match;
use lattice_core::job::{JobSpec, SkipDecision};
use lattice_core::pipeline::SkipConfig;
use lattice_core::ports::HistoryStore;
use lattice_core::trigger::{TriggerContext, TriggerKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a job instance can be skipped without execution.
///
/// Skip is a throughput optimization for redundant re-triggers, never
/// a substitute for a required gate: trigger kinds in the do-not-skip
/// set and pushes to protected branches always force execution, and
/// any uncertainty degrades to running the job.
pub struct SkipDecider {
    history: Arc<dyn HistoryStore>,
    config: SkipConfig,
}

impl SkipDecider {
    pub fn new(history: Arc<dyn HistoryStore>, config: SkipConfig) -> Self {
        Self { history, config }
    }

    pub async fn should_skip(&self, spec: &JobSpec, ctx: &TriggerContext) -> SkipDecision {
        let fingerprint = ctx.fingerprint.clone();

        if self.config.do_not_skip.contains(&ctx.kind) {
            return SkipDecision::run(fingerprint);
        }

        if ctx.kind == TriggerKind::Push
            && let Some(branch) = &ctx.branch
            && self
                .config
                .protected_branches
                .iter()
                .any(|pattern| glob_match(pattern, branch))
        {
            return SkipDecision::run(fingerprint);
        }

        // Changed-path set fully covered by the ignore globs: nothing
        // this pipeline cares about changed.
        if !ctx.changed_paths.is_empty()
            && !self.config.paths_ignore.is_empty()
            && ctx.changed_paths.iter().all(|path| {
                self.config
                    .paths_ignore
                    .iter()
                    .any(|pattern| glob_match(pattern, path))
            })
        {
            debug!(job = %spec.display_name, "Skipping: all changed paths ignored");
            return SkipDecision::skip(fingerprint);
        }

        match self.history.lookup(&spec.history_key()).await {
            Ok(Some(previous)) if previous == ctx.fingerprint => {
                debug!(job = %spec.display_name, "Skipping: fingerprint matches last successful run");
                SkipDecision::skip(fingerprint)
            }
            Ok(_) => SkipDecision::run(fingerprint),
            Err(e) => {
                warn!(job = %spec.display_name, error = %e, "History lookup failed, not skipping");
                SkipDecision::run(fingerprint)
            }
        }
    }
}
