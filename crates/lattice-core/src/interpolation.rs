//! Variable interpolation for step and toolchain commands.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;

/// Context for variable interpolation.
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    /// Pipeline variables
    pub variables: HashMap<String, String>,
    /// Matrix values for the current job
    pub matrix: HashMap<String, String>,
}

impl InterpolationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from pipeline variables and a job's merged
    /// matrix variables. JSON scalars are rendered without quotes.
    pub fn for_job(
        variables: &HashMap<String, String>,
        matrix: &IndexMap<String, serde_json::Value>,
    ) -> Self {
        let matrix = matrix
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect();
        Self {
            variables: variables.clone(),
            matrix,
        }
    }

    /// Interpolate variables in a string.
    ///
    /// Supports:
    /// - `${{ variable }}` - direct variable lookup
    /// - `${{ env.VAR }}` - environment variable
    /// - `${{ matrix.key }}` - matrix value
    pub fn interpolate(&self, input: &str) -> String {
        let re = Regex::new(r"\$\{\{\s*([^}]+)\s*\}\}").unwrap();

        re.replace_all(input, |caps: &regex::Captures| {
            let expr = caps.get(1).map_or("", |m| m.as_str()).trim();
            self.resolve_expression(expr)
        })
        .to_string()
    }

    fn resolve_expression(&self, expr: &str) -> String {
        if let Some(var_name) = expr.strip_prefix("env.") {
            return self
                .variables
                .get(var_name)
                .cloned()
                .or_else(|| std::env::var(var_name).ok())
                .unwrap_or_default();
        }

        if let Some(key) = expr.strip_prefix("matrix.") {
            return self.matrix.get(key).cloned().unwrap_or_default();
        }

        self.variables.get(expr).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_interpolation() {
        let mut ctx = InterpolationContext::new();
        ctx.matrix
            .insert("target".to_string(), "x86_64-unknown-linux-gnu".to_string());

        assert_eq!(
            ctx.interpolate("cargo build --target ${{ matrix.target }}"),
            "cargo build --target x86_64-unknown-linux-gnu"
        );
    }

    #[test]
    fn test_variable_interpolation() {
        let mut ctx = InterpolationContext::new();
        ctx.variables
            .insert("features".to_string(), "battery".to_string());

        assert_eq!(
            ctx.interpolate("cargo test --features ${{ features }}"),
            "cargo test --features battery"
        );
    }

    #[test]
    fn test_unknown_expression_is_empty() {
        let ctx = InterpolationContext::new();
        assert_eq!(ctx.interpolate("echo ${{ matrix.missing }}"), "echo ");
    }

    #[test]
    fn test_for_job_renders_scalars() {
        let mut matrix = IndexMap::new();
        matrix.insert("cross".to_string(), serde_json::json!(true));
        let ctx = InterpolationContext::for_job(&HashMap::new(), &matrix);
        assert_eq!(ctx.interpolate("${{ matrix.cross }}"), "true");
    }
}
