//! Test fixtures for creating sample pipeline definitions.

use indexmap::IndexMap;
use lattice_core::pipeline::{
    JobPolicy, MatrixDefinition, PipelineDefinition, SkipConfig, StepDefinition, Variant,
};
use std::collections::HashMap;

/// Factory for creating test pipelines.
pub struct PipelineFixture;

impl PipelineFixture {
    /// One matrix, one axis, one variant: a single job.
    pub fn simple() -> PipelineDefinition {
        PipelineDefinition {
            version: "1".to_string(),
            name: "test-pipeline".to_string(),
            description: Some("A simple test pipeline".to_string()),
            variables: HashMap::new(),
            matrices: vec![MatrixDefinition {
                name: "ci".to_string(),
                axes: Self::axes(&[("channel", &["stable"])]),
                exclude: vec![],
                policy: JobPolicy::Required,
                fail_fast: false,
                toolchain: None,
                steps: vec![
                    Self::step("fmt", "fmt"),
                    Self::step("build", "build-${{ matrix.channel }}"),
                    Self::step("test", "test-${{ matrix.channel }}"),
                ],
            }],
            skip: SkipConfig::default(),
            max_parallel: 4,
        }
    }

    /// A two-axis matrix: os x channel, four jobs, with step commands
    /// interpolated so each job's invocations are distinguishable.
    pub fn os_by_channel() -> PipelineDefinition {
        let mut pipeline = Self::simple();
        pipeline.name = "matrix-pipeline".to_string();
        pipeline.matrices = vec![MatrixDefinition {
            name: "ci".to_string(),
            axes: Self::axes(&[("os", &["linux", "macos"]), ("channel", &["stable", "beta"])]),
            exclude: vec![],
            policy: JobPolicy::Required,
            fail_fast: false,
            toolchain: None,
            steps: vec![
                Self::step("build", "build-${{ matrix.os }}-${{ matrix.channel }}"),
                Self::step("test", "test-${{ matrix.os }}-${{ matrix.channel }}"),
                Self::step("lint", "lint-${{ matrix.os }}-${{ matrix.channel }}"),
            ],
        }];
        pipeline
    }

    /// A required stable matrix plus a best-effort nightly matrix,
    /// mirroring the usual "nightly may break" layout.
    pub fn with_nightly() -> PipelineDefinition {
        let mut pipeline = Self::os_by_channel();
        pipeline.name = "nightly-pipeline".to_string();
        pipeline.matrices.push(MatrixDefinition {
            name: "nightly".to_string(),
            axes: Self::axes(&[("os", &["linux"])]),
            exclude: vec![],
            policy: JobPolicy::BestEffort,
            fail_fast: false,
            toolchain: None,
            steps: vec![Self::step("build", "nightly-build-${{ matrix.os }}")],
        });
        pipeline
    }

    pub fn step(name: &str, run: &str) -> StepDefinition {
        StepDefinition {
            name: name.to_string(),
            run: run.to_string(),
            env: HashMap::new(),
            when: None,
        }
    }

    pub fn axes(axes: &[(&str, &[&str])]) -> IndexMap<String, Vec<Variant>> {
        axes.iter()
            .map(|(name, variants)| {
                (
                    name.to_string(),
                    variants
                        .iter()
                        .map(|v| Variant(serde_json::json!(v)))
                        .collect(),
                )
            })
            .collect()
    }
}
