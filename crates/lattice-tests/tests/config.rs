//! YAML configuration scenarios: parse, validate, expand, and check
//! gate behavior on a realistic definition.

use lattice_core::job::JobStatus;
use lattice_core::pipeline::{JobPolicy, PipelineDefinition};
use lattice_core::trigger::TriggerKind;
use lattice_scheduler::history::MemoryHistoryStore;
use lattice_scheduler::matrix::MatrixExpander;
use lattice_tests::{ScriptedRunner, test_dispatcher, trigger};
use std::sync::Arc;
use tokio::sync::mpsc;

const PIPELINE_YAML: &str = r#"
version: "1"
name: monitor-ci
variables:
  features: battery

matrices:
  - name: ci
    axes:
      platform:
        - { os: linux, target: x86_64-unknown-linux-gnu, cross: false }
        - { os: linux, target: aarch64-unknown-linux-gnu, cross: true }
        - { os: macos, target: aarch64-apple-darwin, cross: false }
      channel: [stable, beta]
    exclude:
      - { platform: { os: macos }, channel: beta }
    fail_fast: false
    toolchain: rustup toolchain install ${{ matrix.channel }}
    steps:
      - name: fmt
        run: fmt-${{ matrix.target }}-${{ matrix.channel }}
      - name: build
        run: build-${{ matrix.target }}-${{ matrix.channel }}
      - name: cross-test
        run: cross-test-${{ matrix.target }}
        when: { cross: true }
      - name: test
        run: test-${{ matrix.target }}-${{ matrix.channel }}
        when: { cross: false }

  - name: nightly
    policy: best-effort
    axes:
      os: [linux]
    steps:
      - name: build
        run: nightly-${{ matrix.os }}

skip:
  do_not_skip: [manual, push]
  protected_branches: ["release/*"]
  paths_ignore: ["*.md"]
"#;

fn parse() -> PipelineDefinition {
    let definition: PipelineDefinition = serde_yaml::from_str(PIPELINE_YAML).unwrap();
    definition.validate().unwrap();
    definition
}

#[test]
fn test_parse_and_expand() {
    let definition = parse();
    assert_eq!(definition.variables["features"], "battery");
    assert_eq!(definition.matrices[1].policy, JobPolicy::BestEffort);

    let jobs = MatrixExpander::new().expand_pipeline(&definition).unwrap();
    // 3 platforms x 2 channels minus the macos/beta exclusion, plus
    // the nightly job.
    assert_eq!(jobs.len(), 6);

    let ci_jobs: Vec<_> = jobs.iter().filter(|j| j.matrix == "ci").collect();
    assert_eq!(ci_jobs.len(), 5);
    assert!(
        ci_jobs
            .iter()
            .all(|j| j.toolchain.as_deref() == Some("rustup toolchain install ${{ matrix.channel }}"))
    );
}

#[tokio::test]
async fn test_gated_steps_follow_platform_record() {
    let definition = parse();
    let jobs = MatrixExpander::new().expand_pipeline(&definition).unwrap();

    let runner = Arc::new(ScriptedRunner::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let dispatcher = test_dispatcher(runner.clone(), history, definition.skip.clone(), 4);
    let (tx, _rx) = mpsc::channel(256);

    let ctx = trigger(TriggerKind::PullRequest, "fff");
    let results = dispatcher.run(jobs, &ctx, tx).await.unwrap();
    assert!(results.iter().all(|r| r.status == JobStatus::Succeeded));

    let invoked = runner.invoked();
    // Cross targets run cross-test, native targets run test; never both.
    assert!(invoked.contains(&"cross-test-aarch64-unknown-linux-gnu".to_string()));
    assert!(invoked.contains(&"test-x86_64-unknown-linux-gnu-stable".to_string()));
    assert!(!invoked.contains(&"cross-test-x86_64-unknown-linux-gnu".to_string()));
    assert!(
        !invoked
            .iter()
            .any(|run| run.starts_with("test-aarch64-unknown-linux-gnu"))
    );
}
