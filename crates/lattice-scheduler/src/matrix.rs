//! Matrix expansion: axis definitions crossed into concrete jobs.

use indexmap::IndexMap;
use lattice_core::Result;
use lattice_core::ids::JobId;
use lattice_core::job::JobSpec;
use lattice_core::pipeline::{MatrixDefinition, PipelineDefinition, Variant};

/// Expander for matrix definitions.
///
/// Pure function of its inputs: identical definitions always yield an
/// identical ordered job sequence (axes iterate in declaration order).
pub struct MatrixExpander;

impl MatrixExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expand every matrix of a pipeline, in declaration order.
    pub fn expand_pipeline(&self, definition: &PipelineDefinition) -> Result<Vec<JobSpec>> {
        definition.validate()?;

        let mut jobs = Vec::new();
        for matrix in &definition.matrices {
            jobs.extend(self.expand(matrix)?);
        }
        Ok(jobs)
    }

    /// Expand one matrix into job specifications.
    ///
    /// Excluded combinations are dropped before JobSpec
    /// materialization and never reach a job runner.
    pub fn expand(&self, matrix: &MatrixDefinition) -> Result<Vec<JobSpec>> {
        matrix.validate()?;

        let mut combinations: Vec<IndexMap<String, Variant>> = vec![IndexMap::new()];
        for (axis, variants) in &matrix.axes {
            let mut next = Vec::with_capacity(combinations.len() * variants.len());
            for combination in &combinations {
                for variant in variants {
                    let mut extended = combination.clone();
                    extended.insert(axis.clone(), variant.clone());
                    next.push(extended);
                }
            }
            combinations = next;
        }

        combinations.retain(|combination| {
            !matrix
                .exclude
                .iter()
                .any(|rule| Self::matches_exclude(combination, rule))
        });

        Ok(combinations
            .into_iter()
            .map(|selection| {
                let mut variables = IndexMap::new();
                for (axis, variant) in &selection {
                    variant.merge_into(axis, &mut variables);
                }
                let display_name = Self::format_display_name(&matrix.name, &selection);
                JobSpec {
                    id: JobId::new(),
                    matrix: matrix.name.clone(),
                    display_name,
                    selection,
                    variables,
                    policy: matrix.policy,
                    fail_fast: matrix.fail_fast,
                    toolchain: matrix.toolchain.clone(),
                    steps: matrix.steps.clone(),
                }
            })
            .collect())
    }

    fn matches_exclude(
        combination: &IndexMap<String, Variant>,
        rule: &IndexMap<String, serde_json::Value>,
    ) -> bool {
        rule.iter().all(|(axis, want)| {
            combination
                .get(axis)
                .is_some_and(|variant| variant.matches(axis, want))
        })
    }

    fn format_display_name(matrix_name: &str, selection: &IndexMap<String, Variant>) -> String {
        if selection.is_empty() {
            return matrix_name.to_string();
        }

        let parts: Vec<String> = selection
            .iter()
            .map(|(axis, variant)| format!("{}={}", axis, variant.label(axis)))
            .collect();

        format!("{} ({})", matrix_name, parts.join(", "))
    }
}

impl Default for MatrixExpander {
    fn default() -> Self {
        Self::new()
    }
}
