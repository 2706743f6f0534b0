use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;

pub fn execute(orchestrator: &Orchestrator) -> Result<()> {
    println!("{}", "Task Dependency Graph:".bold().underline());

    let result = orchestrator.list_tasks();
    if result.tasks.is_empty() {
        println!("No tasks registered");
        return Ok(());
    }

    for task in &result.tasks {
        println!("{}", task.name.blue().bold());

        if !task.prerequisites.is_empty() {
            println!("  {} {}", "depends on:".dimmed(), task.prerequisites.join(", "));
        } else {
            println!("  {}", "no dependencies".dimmed());
        }
        if !task.dependents.is_empty() {
            println!("  {} {}", "required by:".dimmed(), task.dependents.join(", "));
        }
        println!();
    }

    Ok(())
}
