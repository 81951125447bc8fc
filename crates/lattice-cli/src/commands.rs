//! CLI command definitions.

use clap::{Subcommand, ValueEnum};
use lattice_core::trigger::TriggerKind;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new pipeline
    Init,

    /// Validate pipeline configuration
    Validate {
        /// Path to pipeline file
        #[arg(default_value = "lattice.yaml")]
        path: String,
    },

    /// List the jobs a pipeline expands into
    Jobs {
        /// Path to pipeline file
        #[arg(default_value = "lattice.yaml")]
        path: String,
    },

    /// Run a pipeline to completion
    Run {
        /// Path to pipeline file
        #[arg(default_value = "lattice.yaml")]
        path: String,

        /// Trigger event kind
        #[arg(short, long, value_enum, default_value = "manual")]
        event: EventArg,

        /// Branch the event refers to
        #[arg(short, long)]
        branch: Option<String>,

        /// Changed file path, relative to the workspace (repeatable)
        #[arg(long = "changed")]
        changed: Vec<String>,

        /// Working directory for step commands
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Override the pipeline's concurrency limit
        #[arg(long)]
        max_parallel: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventArg {
    Manual,
    Push,
    PullRequest,
}

impl From<EventArg> for TriggerKind {
    fn from(event: EventArg) -> Self {
        match event {
            EventArg::Manual => TriggerKind::Manual,
            EventArg::Push => TriggerKind::Push,
            EventArg::PullRequest => TriggerKind::PullRequest,
        }
    }
}
