//! Lattice CI execution engine.
//!
//! Defines the external collaborator traits (`TaskRunner`,
//! `ToolchainProvisioner`), the host shell adapter, and the per-job
//! state machine that drives a step sequence to a terminal status.

pub mod job;
pub mod runner;
pub mod shell;
pub mod toolchain;

pub use job::JobRunner;
pub use runner::{Invocation, OutputLine, OutputStream, RunnerConfig, TaskResult, TaskRunner, ToolchainProvisioner};
pub use shell::ShellRunner;
pub use toolchain::{CommandProvisioner, NoopProvisioner};
