use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;

pub fn execute(orchestrator: &Orchestrator, tasks: &[String]) -> Result<()> {
    let requested = if tasks.is_empty() {
        orchestrator.default_tasks()
    } else {
        tasks
    };
    println!("{} {}", "Execution plan for".bold(), requested.join(", ").cyan());

    // Get execution plan from the orchestrator
    let result = orchestrator
        .plan(tasks)
        .map_err(|e| anyhow::anyhow!("Failed to get execution plan: {}", e))?;

    if result.plan.is_empty() {
        println!("  {}", "Nothing to run".dimmed());
        return Ok(());
    }

    println!("\n{}:", "Execution order".bold());
    for (i, wave) in result.plan.waves().iter().enumerate() {
        let names = wave
            .iter()
            .map(|name| match result.task_colors.get(name) {
                Some(color) => name.color(*color).to_string(),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}. {}", i + 1, names);
    }

    Ok(())
}
