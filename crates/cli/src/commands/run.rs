use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;

use super::report;

pub async fn execute(orchestrator: &Orchestrator, tasks: &[String]) -> Result<()> {
    let result = if tasks.is_empty() {
        println!(
            "{} {}",
            "Running default tasks".bold(),
            orchestrator.default_tasks().join(", ").cyan()
        );
        println!();
        orchestrator.run_default().await
    } else {
        println!("{} {}", "Running".bold(), tasks.join(", ").cyan());
        println!();
        orchestrator.run_named(tasks).await
    };

    let run_report = result.map_err(|e| anyhow::anyhow!("Failed to run tasks: {}", e))?;
    report::render(&run_report)
}
