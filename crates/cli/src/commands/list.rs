use anyhow::Result;
use colored::*;
use drover_core::orchestrator::Orchestrator;

pub fn execute(orchestrator: &Orchestrator) -> Result<()> {
    let result = orchestrator.list_tasks();

    println!("{}", "Tasks".bold().underline());

    if result.tasks.is_empty() {
        println!("  {}", "No tasks found".dimmed());
        return Ok(());
    }

    for task in &result.tasks {
        let name = match result.task_colors.get(&task.name) {
            Some(color) => task.name.color(*color).bold(),
            None => task.name.bold(),
        };
        let mut tags = Vec::new();
        if let Some(group) = &task.group {
            tags.push(format!("[{}]", group));
        }
        if task.is_default {
            tags.push("[default]".to_string());
        }

        if tags.is_empty() {
            println!("{}", name);
        } else {
            println!("{} {}", name, tags.join(" ").green());
        }

        if let Some(description) = &task.description {
            println!("  {}", description.dimmed());
        }
        if !task.prerequisites.is_empty() {
            println!("  {} {}", "needs:".dimmed(), task.prerequisites.join(", "));
        }
        if !task.watched_by.is_empty() {
            println!("  {} {}", "watches:".dimmed(), task.watched_by.join(", "));
        }
    }

    Ok(())
}
