//! Lattice CI CLI entrypoint.

use clap::Parser;

mod commands;
mod context;
mod handlers;
mod history;

use commands::Commands;

#[derive(Parser)]
#[command(name = "lattice")]
#[command(author, version, about = "Lattice CI matrix orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => handlers::init()?,
        Commands::Validate { path } => handlers::validate(&path)?,
        Commands::Jobs { path } => handlers::jobs(&path)?,
        Commands::Run {
            path,
            event,
            branch,
            changed,
            workspace,
            max_parallel,
        } => {
            let verdict =
                handlers::run_pipeline(&path, event, branch, changed, workspace, max_parallel)
                    .await?;
            if !verdict.is_success() {
                std::process::exit(verdict.exit_code());
            }
        }
    }

    Ok(())
}
