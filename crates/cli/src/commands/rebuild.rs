use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;

use super::report;

pub async fn execute(orchestrator: &Orchestrator) -> Result<()> {
    if let Some(rebuild) = orchestrator.full_rebuild() {
        println!(
            "{} {} {} {}",
            "Rebuilding:".bold(),
            rebuild.clean.cyan(),
            "then".dimmed(),
            rebuild.build.join(", ").cyan()
        );
        println!();
    }

    let run_report = orchestrator
        .run_full_rebuild()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to rebuild: {}", e))?;
    report::render(&run_report)
}
