//! Pipeline definition types.
//!
//! These types represent the user-authored pipeline YAML configuration:
//! one or more named matrices, each an ordered set of axes crossed into
//! concrete jobs, plus the skip policy and concurrency limit.

use crate::error::{Error, Result};
use crate::trigger::TriggerKind;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineDefinition {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub matrices: Vec<MatrixDefinition>,
    #[serde(default)]
    pub skip: SkipConfig,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    4
}

impl PipelineDefinition {
    /// Validate structural invariants that must hold before any job
    /// is expanded or dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidPipeline("pipeline name is empty".to_string()));
        }
        if self.matrices.is_empty() {
            return Err(Error::InvalidPipeline(
                "pipeline defines no matrices".to_string(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(Error::InvalidPipeline(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        for matrix in &self.matrices {
            matrix.validate()?;
        }
        Ok(())
    }
}

/// One build matrix: an ordered set of axes crossed into jobs that all
/// share the same step sequence and policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatrixDefinition {
    pub name: String,
    pub axes: IndexMap<String, Vec<Variant>>,
    #[serde(default)]
    pub exclude: Vec<IndexMap<String, serde_json::Value>>,
    #[serde(default)]
    pub policy: JobPolicy,
    #[serde(default)]
    pub fail_fast: bool,
    /// Command invoked once per job before its first step, e.g. a
    /// `rustup toolchain install` line. Interpolated like step commands.
    #[serde(default)]
    pub toolchain: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl MatrixDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.axes.is_empty() {
            return Err(Error::InvalidAxisSet {
                matrix: self.name.clone(),
                message: "matrix declares no axes".to_string(),
            });
        }
        for (axis, variants) in &self.axes {
            if variants.is_empty() {
                return Err(Error::InvalidAxisSet {
                    matrix: self.name.clone(),
                    message: format!("axis '{}' has no variants", axis),
                });
            }
        }
        for rule in &self.exclude {
            for axis in rule.keys() {
                if !self.axes.contains_key(axis) {
                    return Err(Error::InvalidExclusionRule {
                        matrix: self.name.clone(),
                        axis: axis.clone(),
                    });
                }
            }
        }
        if self.steps.is_empty() {
            return Err(Error::InvalidPipeline(format!(
                "matrix '{}' has no steps",
                self.name
            )));
        }
        Ok(())
    }
}

/// One concrete value along an axis.
///
/// A variant is either a scalar (shorthand for `{axis: scalar}`) or an
/// opaque key/value record, e.g. `{os: macos, target: aarch64-apple-darwin}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Variant(pub serde_json::Value);

impl Variant {
    /// Check whether this variant matches an exclusion-rule value for
    /// the given axis: scalar equality, the record's value under the
    /// axis name, or a record subset.
    pub fn matches(&self, axis: &str, want: &serde_json::Value) -> bool {
        if self.0 == *want {
            return true;
        }
        if let serde_json::Value::Object(record) = &self.0 {
            if let serde_json::Value::Object(want_record) = want {
                return want_record
                    .iter()
                    .all(|(k, v)| record.get(k) == Some(v));
            }
            return record.get(axis) == Some(want);
        }
        false
    }

    /// Merge this variant's values into a job's variable record.
    /// Scalars bind under the axis name; record entries merge directly.
    pub fn merge_into(&self, axis: &str, variables: &mut IndexMap<String, serde_json::Value>) {
        match &self.0 {
            serde_json::Value::Object(record) => {
                for (k, v) in record {
                    variables.insert(k.clone(), v.clone());
                }
            }
            other => {
                variables.insert(axis.to_string(), other.clone());
            }
        }
    }

    /// Short label for display names: the scalar itself, or the
    /// record's value under the axis name, or the record's first value.
    pub fn label(&self, axis: &str) -> String {
        let value = match &self.0 {
            serde_json::Value::Object(record) => record
                .get(axis)
                .or_else(|| record.values().next())
                .cloned()
                .unwrap_or(serde_json::Value::Null),
            other => other.clone(),
        };
        match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// Whether a job's failure determines the pipeline verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobPolicy {
    #[default]
    Required,
    BestEffort,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepDefinition {
    pub name: String,
    /// Opaque invocation handed to the task runner.
    pub run: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Gate: the step only runs when every entry matches the job's
    /// variables. A list value matches any of its elements.
    #[serde(default)]
    pub when: Option<IndexMap<String, serde_json::Value>>,
}

impl StepDefinition {
    /// Evaluate this step's gate against a job's merged variables.
    /// A step with no `when` clause is gated only by the AND-chain.
    pub fn gate_matches(&self, variables: &IndexMap<String, serde_json::Value>) -> bool {
        let Some(when) = &self.when else {
            return true;
        };
        when.iter().all(|(key, want)| {
            let Some(actual) = variables.get(key) else {
                return false;
            };
            match want {
                serde_json::Value::Array(any_of) => any_of.contains(actual),
                other => actual == other,
            }
        })
    }
}

/// Skip/dedup policy for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipConfig {
    /// Trigger kinds that always force execution.
    #[serde(default = "default_do_not_skip")]
    pub do_not_skip: Vec<TriggerKind>,
    /// Pushes to these branches always force execution.
    #[serde(default)]
    pub protected_branches: Vec<String>,
    /// Changed-path sets fully covered by these globs are skippable.
    #[serde(default)]
    pub paths_ignore: Vec<String>,
}

fn default_do_not_skip() -> Vec<TriggerKind> {
    vec![TriggerKind::Manual, TriggerKind::Push]
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            do_not_skip: default_do_not_skip(),
            protected_branches: vec![],
            paths_ignore: vec![],
        }
    }
}
