//! Lattice CI scheduling and orchestration.
//!
//! Expands matrix definitions into job specifications, decides which
//! jobs can be skipped, dispatches bounded-concurrency job runners,
//! and aggregates terminal results into one pipeline verdict.

pub mod aggregate;
pub mod dispatcher;
pub mod history;
pub mod matrix;
pub mod skip;

pub use aggregate::{ReportLine, ResultAggregator};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use history::MemoryHistoryStore;
pub use matrix::MatrixExpander;
pub use skip::SkipDecider;
