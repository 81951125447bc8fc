//! Error types for Lattice CI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors: fatal before any job starts
    #[error("Invalid pipeline definition: {0}")]
    InvalidPipeline(String),

    #[error("Invalid axis set in matrix '{matrix}': {message}")]
    InvalidAxisSet { matrix: String, message: String },

    #[error("Invalid exclusion rule in matrix '{matrix}': unknown axis '{axis}'")]
    InvalidExclusionRule { matrix: String, axis: String },

    // Step errors: contained to their job
    #[error("Step invocation failed: {0}")]
    StepInvocation(String),

    #[error("Toolchain provisioning failed: {0}")]
    Provisioning(String),

    // Skip history errors: non-fatal, skip degrades to false
    #[error("Skip history unavailable: {0}")]
    HistoryUnavailable(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
