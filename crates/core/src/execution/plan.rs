//! Execution plan building
//!
//! This module resolves a run request into the transitive closure of its
//! prerequisites and groups the result into waves by topological level.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::registry::TaskRegistry;
use crate::types::{DroverError, DroverResult};

/// Tasks grouped into waves. Every task in a wave only depends on tasks in
/// earlier waves, so a wave may run concurrently once the previous one is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    waves: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    /// Total number of tasks across all waves
    pub fn len(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.wave_of(name).is_some()
    }

    pub fn wave_of(&self, name: &str) -> Option<usize> {
        self.waves
            .iter()
            .position(|wave| wave.iter().any(|task| task == name))
    }

    /// Task names in execution order
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.waves.iter().flatten().map(String::as_str)
    }
}

/// Build the execution plan for the requested tasks.
///
/// A task's wave is one more than the highest wave among its prerequisites;
/// tasks without prerequisites land in wave 0. Within a wave, tasks keep their
/// registration order.
pub fn build_plan<S: AsRef<str>>(
    registry: &TaskRegistry,
    requested: &[S],
) -> DroverResult<ExecutionPlan> {
    let mut queue = VecDeque::new();
    for name in requested {
        let name = name.as_ref();
        if !registry.contains(name) {
            return Err(DroverError::UnknownTask(name.to_string()));
        }
        queue.push_back(name);
    }

    // Transitive closure over prerequisite edges
    let mut closure = HashSet::new();
    while let Some(name) = queue.pop_front() {
        if !closure.insert(name) {
            continue;
        }
        if let Some(task) = registry.get(name) {
            queue.extend(task.prerequisites().iter().map(String::as_str));
        }
    }

    // Registration order is a topological order since prerequisites must be
    // registered before their dependents.
    let mut ordered: Vec<&str> = closure.into_iter().collect();
    ordered.sort_by_key(|name| registry.position(name));

    let mut levels: HashMap<&str, usize> = HashMap::new();
    let mut waves: Vec<Vec<String>> = Vec::new();
    for name in ordered {
        let level = registry
            .get(name)
            .map(|task| {
                task.prerequisites()
                    .iter()
                    .filter_map(|p| levels.get(p.as_str()))
                    .map(|wave| wave + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        levels.insert(name, level);
        if waves.len() <= level {
            waves.resize_with(level + 1, Vec::new);
        }
        waves[level].push(name.to_string());
    }

    tracing::debug!(
        requested = requested.len(),
        tasks = levels.len(),
        waves = waves.len(),
        "built execution plan"
    );

    Ok(ExecutionPlan { waves })
}
