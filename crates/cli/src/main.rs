use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drover_core::orchestrator::{Orchestrator, OrchestratorConfig};
use tracing_subscriber::EnvFilter;

mod commands;

/// Drover - A build task orchestrator
#[derive(Parser)]
#[command(name = "drover")]
#[command(about = "Run build tasks in dependency order, rebuild from scratch, or watch for changes")]
#[command(version)]
struct Cli {
    /// Path to the workspace root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Pipeline file (defaults to drover.yml in the workspace root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log task progress
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks and their prerequisites (the default set when none are given)
    Run {
        /// Task names
        tasks: Vec<String>,
    },
    /// Show the execution plan without running anything
    Plan {
        /// Task names
        tasks: Vec<String>,
    },
    /// Clean, then build everything
    Rebuild,
    /// Re-run bound tasks whenever watched files change
    Watch {
        /// Do not run the default task set before watching
        #[arg(long)]
        skip_initial: bool,
    },
    /// List registered tasks
    List,
    /// Show the task dependency graph
    Graph,
    /// Print the JSON schema of the pipeline file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    // The schema does not depend on any pipeline file
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    let orchestrator = Orchestrator::load(OrchestratorConfig {
        workspace_root: cli.workspace,
        config_path: cli.config,
    })
    .map_err(|e| anyhow::anyhow!("Failed to load pipeline: {}", e))?;

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Run { tasks } => commands::run::execute(&orchestrator, &tasks).await,
        Commands::Plan { tasks } => commands::plan::execute(&orchestrator, &tasks),
        Commands::Rebuild => commands::rebuild::execute(&orchestrator).await,
        Commands::Watch { skip_initial } => {
            commands::watch::execute(&orchestrator, skip_initial).await
        }
        Commands::List => commands::list::execute(&orchestrator),
        Commands::Graph => commands::graph::execute(&orchestrator),
        Commands::Schema => commands::schema::execute(),
    }
}
