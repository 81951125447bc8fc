//! Verdict aggregation over terminal job results.

use lattice_core::job::{JobResult, JobStatus, PipelineVerdict};
use lattice_core::pipeline::JobPolicy;
use tracing::info;

/// One line of the per-job summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub display_name: String,
    pub policy: JobPolicy,
    pub status: JobStatus,
    pub duration_ms: u64,
    /// Whether this job's status counted against the verdict.
    pub determines_verdict: bool,
}

/// Folds job results into a single pipeline verdict.
///
/// The verdict is failure exactly when some required job failed or was
/// cancelled. Skipped jobs count as passing, and best-effort outcomes
/// are reported but never decide the verdict.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn verdict(&self, results: &[JobResult]) -> PipelineVerdict {
        let failed: Vec<&JobResult> = results.iter().filter(|r| r.affects_verdict()).collect();

        if failed.is_empty() {
            info!(jobs = results.len(), "Pipeline succeeded");
            PipelineVerdict::Success
        } else {
            info!(
                jobs = results.len(),
                failed = failed.len(),
                "Pipeline failed"
            );
            PipelineVerdict::Failure
        }
    }

    /// Summary lines in the order the results were given.
    pub fn report(&self, results: &[JobResult]) -> Vec<ReportLine> {
        results
            .iter()
            .map(|r| ReportLine {
                display_name: r.display_name.clone(),
                policy: r.policy,
                status: r.status,
                duration_ms: r.duration_ms,
                determines_verdict: r.affects_verdict(),
            })
            .collect()
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_core::ids::JobId;

    fn result(name: &str, policy: JobPolicy, status: JobStatus) -> JobResult {
        JobResult {
            job_id: JobId::new(),
            matrix: "ci".to_string(),
            display_name: name.to_string(),
            policy,
            status,
            steps: vec![],
            duration_ms: 10,
        }
    }

    #[test]
    fn test_all_succeeded_is_success() {
        let results = vec![
            result("a", JobPolicy::Required, JobStatus::Succeeded),
            result("b", JobPolicy::Required, JobStatus::Succeeded),
        ];
        assert!(ResultAggregator::new().verdict(&results).is_success());
    }

    #[test]
    fn test_required_failure_is_failure() {
        let results = vec![
            result("a", JobPolicy::Required, JobStatus::Succeeded),
            result("b", JobPolicy::Required, JobStatus::Failed),
        ];
        let verdict = ResultAggregator::new().verdict(&results);
        assert!(!verdict.is_success());
        assert_eq!(verdict.exit_code(), 1);
    }

    #[test]
    fn test_required_cancellation_is_failure() {
        let results = vec![result("a", JobPolicy::Required, JobStatus::Cancelled)];
        assert!(!ResultAggregator::new().verdict(&results).is_success());
    }

    #[test]
    fn test_best_effort_failure_is_success() {
        let results = vec![
            result("a", JobPolicy::Required, JobStatus::Succeeded),
            result("nightly", JobPolicy::BestEffort, JobStatus::Failed),
        ];
        assert!(ResultAggregator::new().verdict(&results).is_success());
    }

    #[test]
    fn test_skipped_counts_as_passing() {
        let results = vec![
            result("a", JobPolicy::Required, JobStatus::Skipped),
            result("b", JobPolicy::Required, JobStatus::Succeeded),
        ];
        assert!(ResultAggregator::new().verdict(&results).is_success());
    }

    #[test]
    fn test_empty_matrix_is_success() {
        assert!(ResultAggregator::new().verdict(&[]).is_success());
    }

    #[test]
    fn test_report_marks_verdict_determining_jobs() {
        let results = vec![
            result("a", JobPolicy::Required, JobStatus::Failed),
            result("nightly", JobPolicy::BestEffort, JobStatus::Failed),
        ];
        let report = ResultAggregator::new().report(&results);
        assert!(report[0].determines_verdict);
        assert!(!report[1].determines_verdict);
    }
}
