use anyhow::Result;
use colored::*;
use drover_core::execution::{RunReport, RunResult};
use drover_core::tasks::get_task_color;

/// Print one line per task, then a summary. Returns an error when any task
/// did not succeed so the process exits non-zero.
pub fn render(report: &RunReport) -> Result<()> {
    for outcome in report.outcomes() {
        let name = outcome.name.color(get_task_color(&outcome.name)).bold();
        match &outcome.result {
            RunResult::Succeeded => println!(
                "  {} {} {}",
                "✓".green().bold(),
                name,
                format!("({:.2?})", outcome.elapsed).dimmed()
            ),
            RunResult::Failed(message) => {
                println!("  {} {}", "✗".red().bold(), name);
                for line in message.lines() {
                    println!("      {}", line.red());
                }
            }
            RunResult::Skipped { prerequisite } => println!(
                "  {} {} {}",
                "-".yellow().bold(),
                name,
                format!("skipped, '{}' did not succeed", prerequisite).dimmed()
            ),
        }
    }

    println!();
    if report.is_success() {
        println!(
            "{} {}",
            "✓".green().bold(),
            format!("{} tasks completed successfully!", report.succeeded_count())
                .green()
                .bold()
        );
        return Ok(());
    }

    println!(
        "{} {} succeeded, {} failed, {} skipped",
        "✗".red().bold(),
        report.succeeded_count(),
        report.failed_count().to_string().red().bold(),
        report.skipped_count().to_string().yellow()
    );
    anyhow::bail!("{} task(s) failed", report.failed_count())
}
