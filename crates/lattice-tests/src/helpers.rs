//! Scripted collaborator doubles and harness helpers.

use async_trait::async_trait;
use lattice_core::Result;
use lattice_core::fingerprint::Fingerprint;
use lattice_core::pipeline::SkipConfig;
use lattice_core::trigger::{TriggerContext, TriggerKind};
use lattice_runner::runner::{Invocation, OutputLine, TaskResult, TaskRunner};
use lattice_runner::toolchain::NoopProvisioner;
use lattice_scheduler::dispatcher::{DispatchConfig, Dispatcher};
use lattice_scheduler::history::MemoryHistoryStore;
use lattice_scheduler::skip::SkipDecider;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Task runner double that maps interpolated commands to scripted exit
/// codes and records every invocation. Unscripted commands succeed.
pub struct ScriptedRunner {
    exit_codes: Mutex<HashMap<String, i32>>,
    invoked: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            exit_codes: Mutex::new(HashMap::new()),
            invoked: Mutex::new(vec![]),
        }
    }

    /// Script a command to exit with the given code.
    pub fn fail(&self, command: &str, exit_code: i32) {
        self.exit_codes
            .lock()
            .unwrap()
            .insert(command.to_string(), exit_code);
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for ScriptedRunner {
    async fn invoke(
        &self,
        invocation: &Invocation,
        _output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<TaskResult> {
        self.invoked.lock().unwrap().push(invocation.run.clone());
        let exit_code = self
            .exit_codes
            .lock()
            .unwrap()
            .get(&invocation.run)
            .copied()
            .unwrap_or(0);
        Ok(TaskResult {
            exit_code,
            success: exit_code == 0,
            duration_ms: 1,
        })
    }
}

/// Build a dispatcher wired to the scripted runner and an in-memory
/// history store.
pub fn test_dispatcher(
    runner: Arc<ScriptedRunner>,
    history: Arc<MemoryHistoryStore>,
    skip: SkipConfig,
    max_parallel: usize,
) -> Dispatcher {
    Dispatcher::new(
        runner,
        Arc::new(NoopProvisioner),
        history.clone(),
        SkipDecider::new(history, skip),
        DispatchConfig {
            max_parallel,
            workspace: PathBuf::from("/tmp"),
            variables: HashMap::new(),
        },
    )
}

/// A trigger context with a fixed fingerprint.
pub fn trigger(kind: TriggerKind, fingerprint: &str) -> TriggerContext {
    TriggerContext {
        kind,
        branch: Some("main".to_string()),
        changed_paths: vec!["src/lib.rs".to_string()],
        fingerprint: Fingerprint::from_hex(fingerprint),
    }
}
