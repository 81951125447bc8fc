//! Command handlers.

use crate::commands::EventArg;
use crate::history::FileHistoryStore;
use console::style;
use lattice_core::job::{JobStatus, PipelineVerdict};
use lattice_core::pipeline::{JobPolicy, PipelineDefinition};
use lattice_runner::runner::{OutputLine, OutputStream, RunnerConfig};
use lattice_runner::shell::ShellRunner;
use lattice_runner::toolchain::CommandProvisioner;
use lattice_scheduler::aggregate::ResultAggregator;
use lattice_scheduler::dispatcher::{DispatchConfig, Dispatcher};
use lattice_scheduler::matrix::MatrixExpander;
use lattice_scheduler::skip::SkipDecider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Initialize a new pipeline.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new("lattice.yaml");

    if path.exists() {
        println!("{} lattice.yaml already exists", style("!").yellow());
        return Ok(());
    }

    let template = r#"version: "1"
name: my-pipeline

matrices:
  - name: ci
    axes:
      channel: [stable]
    steps:
      - name: build
        run: |
          echo "Building on ${{ matrix.channel }}..."
          # Add your build commands here
"#;

    std::fs::write(path, template)?;
    println!("{} Created lattice.yaml", style("✓").green());
    Ok(())
}

/// Validate a pipeline configuration.
pub fn validate(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let definition = load(path)?;

    println!(
        "{} Pipeline \"{}\" is valid",
        style("✓").green(),
        definition.name
    );
    println!("  Matrices: {}", definition.matrices.len());

    let expander = MatrixExpander::new();
    for matrix in &definition.matrices {
        let jobs = expander.expand(matrix)?;
        println!(
            "    - {} ({} axes, {} jobs)",
            matrix.name,
            matrix.axes.len(),
            jobs.len()
        );
    }

    Ok(())
}

/// List the jobs a pipeline expands into.
pub fn jobs(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let definition = load(path)?;
    let jobs = MatrixExpander::new().expand_pipeline(&definition)?;

    for job in &jobs {
        let marker = match job.policy {
            JobPolicy::Required => style("●").green(),
            JobPolicy::BestEffort => style("○").yellow(),
        };
        println!("{} {}", marker, job.display_name);
    }
    println!("\n{} jobs total", jobs.len());

    Ok(())
}

/// Run a pipeline to completion and report the verdict.
pub async fn run_pipeline(
    path: &str,
    event: EventArg,
    branch: Option<String>,
    changed: Vec<String>,
    workspace: PathBuf,
    max_parallel: Option<usize>,
) -> Result<PipelineVerdict, Box<dyn std::error::Error>> {
    let definition = load(path)?;
    let jobs = MatrixExpander::new().expand_pipeline(&definition)?;

    let ctx = crate::context::build(event.into(), branch, changed, &workspace)?;

    println!(
        "{} Running {} ({} jobs, max {} in parallel)",
        style("▶").cyan(),
        style(&definition.name).bold(),
        jobs.len(),
        max_parallel.unwrap_or(definition.max_parallel)
    );

    let history = Arc::new(FileHistoryStore::open(
        workspace.join(".lattice").join("history.json"),
    )?);
    let runner = Arc::new(ShellRunner::new(RunnerConfig::default()));
    let provisioner = Arc::new(CommandProvisioner::new(
        runner.clone(),
        definition.variables.clone(),
        workspace.clone(),
    ));

    let dispatcher = Dispatcher::new(
        runner,
        provisioner,
        history.clone(),
        SkipDecider::new(history, definition.skip.clone()),
        DispatchConfig {
            max_parallel: max_parallel.unwrap_or(definition.max_parallel),
            workspace,
            variables: definition.variables.clone(),
        },
    );

    let (output_tx, mut output_rx) = mpsc::channel::<OutputLine>(1024);
    let printer = tokio::spawn(async move {
        while let Some(line) = output_rx.recv().await {
            match line.stream {
                OutputStream::Stdout => println!("  {}", line.content),
                OutputStream::Stderr => eprintln!("  {}", style(line.content).dim()),
            }
        }
    });

    let results = dispatcher.run(jobs, &ctx, output_tx).await?;
    // The dispatcher dropped its sender; the printer drains and exits.
    printer.await?;

    let aggregator = ResultAggregator::new();
    println!();
    for line in aggregator.report(&results) {
        let glyph = match line.status {
            JobStatus::Succeeded => style("✓").green(),
            JobStatus::Failed => style("✗").red(),
            JobStatus::Skipped => style("-").dim(),
            JobStatus::Cancelled => style("!").yellow(),
            JobStatus::Pending | JobStatus::Running => style("?").blue(),
        };
        let policy = match line.policy {
            JobPolicy::Required => String::new(),
            JobPolicy::BestEffort => format!(" {}", style("[best-effort]").dim()),
        };
        println!(
            "{} {}{} ({} ms)",
            glyph, line.display_name, policy, line.duration_ms
        );
    }

    let verdict = aggregator.verdict(&results);
    if verdict.is_success() {
        println!("\n{} Pipeline succeeded", style("✓").green());
    } else {
        println!("\n{} Pipeline failed", style("✗").red());
    }

    Ok(verdict)
}

fn load(path: &str) -> Result<PipelineDefinition, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let definition: PipelineDefinition = serde_yaml::from_str(&content)?;
    definition.validate()?;
    Ok(definition)
}
