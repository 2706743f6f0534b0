//! Building a registry from a pipeline file
//!
//! Pipeline files may declare tasks in any order, while the registry only
//! accepts prerequisites that are already registered. The declared tasks are
//! therefore put into a dependency graph first: unknown references and cycles
//! are reported against the whole file, and the tasks are then registered in
//! a topological order that stays as close to declaration order as possible.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;

use crate::action::{NoopAction, SharedAction};
use crate::configs::pipeline::{PipelineConfig, WatchConfig};
use crate::configs::tasks::{Command, TaskConfig};
use crate::execution::command::{CommandAction, CommandSpec, RemoveAction};
use crate::registry::TaskRegistry;
use crate::types::{DroverError, DroverResult};
use crate::watch::binding::WatchBinding;

/// Register every task declared in the pipeline
pub fn build_registry(root: &Path, config: &PipelineConfig) -> DroverResult<TaskRegistry> {
    let order = registration_order(&config.tasks)?;

    let mut registry = TaskRegistry::new();
    for index in order {
        let task = &config.tasks[index];
        let prerequisites: Vec<&str> = task.dependencies().iter().map(String::as_str).collect();
        registry.register_action(
            &task.name,
            &prerequisites,
            task.group.as_deref(),
            build_action(root, task)?,
        )?;
    }

    Ok(registry)
}

/// Compile the watch section into bindings, checking every bound task exists
pub fn build_bindings(
    registry: &TaskRegistry,
    watch: &[WatchConfig],
) -> DroverResult<Vec<WatchBinding>> {
    watch
        .iter()
        .map(|entry| {
            if let Some(missing) = entry.tasks.iter().find(|t| !registry.contains(t)) {
                return Err(DroverError::UnknownTask(missing.clone()));
            }
            WatchBinding::new(&entry.patterns, entry.tasks.clone())
        })
        .collect()
}

fn build_action(root: &Path, task: &TaskConfig) -> DroverResult<SharedAction> {
    if task.action_count() > 1 {
        return Err(DroverError::Config(format!(
            "Task '{}' must set only one of script, command or remove",
            task.name
        )));
    }

    let env = task.env.clone().unwrap_or_default();
    let action: SharedAction = if let Some(script) = &task.script {
        Arc::new(
            CommandAction::new(&task.name, root, CommandSpec::Script(PathBuf::from(script)))
                .with_env(env),
        )
    } else if let Some(command) = &task.command {
        let spec = match command {
            Command::Single(cmd) => CommandSpec::Shell(cmd.clone()),
            Command::Multiple(argv) => CommandSpec::Argv(argv.clone()),
        };
        Arc::new(CommandAction::new(&task.name, root, spec).with_env(env))
    } else if let Some(paths) = &task.remove {
        Arc::new(RemoveAction::new(
            root,
            paths.iter().map(PathBuf::from).collect(),
        ))
    } else {
        // Aggregate task that only groups its dependencies
        Arc::new(NoopAction)
    };

    Ok(action)
}

/// Order declared tasks so that every task comes after its dependencies
fn registration_order(tasks: &[TaskConfig]) -> DroverResult<Vec<usize>> {
    let mut graph = DiGraph::<String, ()>::new();
    let mut node_indices = HashMap::new();

    for task in tasks {
        if node_indices.contains_key(&task.name) {
            return Err(DroverError::DuplicateTask(task.name.clone()));
        }
        let node_index = graph.add_node(task.name.clone());
        node_indices.insert(task.name.clone(), node_index);
    }

    // Add edge: task -> dependency
    for task in tasks {
        let from_node = node_indices[&task.name];
        for dep in task.dependencies() {
            if dep == &task.name {
                continue;
            }
            if let Some(&to_node) = node_indices.get(dep) {
                graph.add_edge(from_node, to_node, ());
            } else {
                return Err(DroverError::UnknownPrerequisite {
                    task: task.name.clone(),
                    prerequisite: dep.clone(),
                });
            }
        }
    }

    // Mutual references show up as strongly connected components. Self
    // references are left for the registry to reject.
    let mut cycles: Vec<Vec<String>> = kosaraju_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut cycle = component
                .iter()
                .map(|node| graph[*node].clone())
                .collect::<Vec<_>>();
            cycle.sort();
            cycle
        })
        .collect();
    cycles.sort();

    if let Some(cycle) = cycles.into_iter().next() {
        return Err(DroverError::CyclicDependency {
            task: cycle[0].clone(),
            cycle,
        });
    }

    // Repeatedly take the earliest declared task whose dependencies are placed
    let mut placed = HashSet::new();
    let mut order = Vec::with_capacity(tasks.len());
    while order.len() < tasks.len() {
        let next = tasks.iter().enumerate().find(|(index, task)| {
            !placed.contains(index)
                && graph
                    .neighbors(node_indices[&task.name])
                    .all(|dep| placed.contains(&dep.index()))
        });
        let Some((index, _)) = next else {
            break;
        };
        placed.insert(index);
        order.push(index);
    }

    Ok(order)
}
