use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;
use drover_core::watch::WatchRun;

use super::report;

pub async fn execute(orchestrator: &Orchestrator, skip_initial: bool) -> Result<()> {
    if !skip_initial {
        println!(
            "{} {}",
            "Running default tasks".bold(),
            orchestrator.default_tasks().join(", ").cyan()
        );
        println!();
        let initial = orchestrator
            .run_default()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run tasks: {}", e))?;
        // An initial failure is reported but does not prevent watching
        if let Err(error) = report::render(&initial) {
            tracing::warn!(%error, "initial run failed");
        }
        println!();
    }

    let (_source, events) = orchestrator
        .watch_workspace()
        .map_err(|e| anyhow::anyhow!("Failed to start watching: {}", e))?;

    for binding in orchestrator.bindings() {
        println!(
            "{} {} {} {}",
            "Watching".bold(),
            binding.patterns().join(", ").cyan(),
            "->".dimmed(),
            binding.tasks().join(", ")
        );
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    tokio::select! {
        summary = orchestrator.start_watch(events, print_run) => {
            println!(
                "{} {} runs, {} failed",
                "Watch ended:".bold(),
                summary.runs,
                summary.failed_runs
            );
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "Stopped watching".dimmed());
        }
    }

    Ok(())
}

fn print_run(run: &WatchRun) {
    println!();
    println!("{} {}", "Change detected, running".bold(), run.tasks.join(", ").cyan());
    match &run.outcome {
        Ok(run_report) => {
            if let Err(error) = report::render(run_report) {
                tracing::debug!(%error, "watch run failed");
            }
        }
        Err(error) => println!("  {} {}", "✗".red().bold(), error.to_string().red()),
    }
}
