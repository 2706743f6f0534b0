//! Task registry
//!
//! The registry owns every task definition and the prerequisite graph between
//! them. Tasks are registered once at startup, prerequisites first, and the
//! registry is then handed to the orchestrator which never mutates it again.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use petgraph::prelude::*;

use crate::action::{SharedAction, TaskAction};
use crate::types::{DroverError, DroverResult};

/// A named unit of work with declared prerequisites
pub struct Task {
    name: String,
    prerequisites: Vec<String>,
    group: Option<String>,
    action: SharedAction,
}

impl Task {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prerequisite names in declaration order
    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn action(&self) -> SharedAction {
        Arc::clone(&self.action)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Registry of tasks and their prerequisite graph.
///
/// Node indices follow registration order, which the plan builder relies on
/// for deterministic wave ordering. Edges point from a task to each of its
/// prerequisites.
#[derive(Default)]
pub struct TaskRegistry {
    graph: DiGraph<String, ()>,
    tasks: Vec<Task>,
    index: HashMap<String, NodeIndex>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with its prerequisites
    pub fn register<A>(&mut self, name: &str, prerequisites: &[&str], action: A) -> DroverResult<()>
    where
        A: TaskAction + 'static,
    {
        self.register_action(name, prerequisites, None, Arc::new(action))
    }

    /// Register a task tagged with a group such as `build` or `watch`
    pub fn register_in_group<A>(
        &mut self,
        name: &str,
        prerequisites: &[&str],
        group: &str,
        action: A,
    ) -> DroverResult<()>
    where
        A: TaskAction + 'static,
    {
        self.register_action(name, prerequisites, Some(group), Arc::new(action))
    }

    /// Register a task from an already shared action.
    ///
    /// All checks run before anything is inserted, so a rejected task leaves
    /// the registry untouched.
    pub fn register_action(
        &mut self,
        name: &str,
        prerequisites: &[&str],
        group: Option<&str>,
        action: SharedAction,
    ) -> DroverResult<()> {
        if self.index.contains_key(name) {
            return Err(DroverError::DuplicateTask(name.to_string()));
        }

        let mut declared = Vec::with_capacity(prerequisites.len());
        for prerequisite in prerequisites {
            if !declared.iter().any(|existing: &String| existing.as_str() == *prerequisite) {
                declared.push(prerequisite.to_string());
            }
        }

        if let Some(cycle) = self.find_cycle(name, &declared) {
            return Err(DroverError::CyclicDependency {
                task: name.to_string(),
                cycle,
            });
        }

        if let Some(missing) = declared.iter().find(|p| !self.index.contains_key(*p)) {
            return Err(DroverError::UnknownPrerequisite {
                task: name.to_string(),
                prerequisite: missing.clone(),
            });
        }

        let node = self.graph.add_node(name.to_string());
        for prerequisite in &declared {
            self.graph.add_edge(node, self.index[prerequisite], ());
        }
        self.index.insert(name.to_string(), node);
        self.tasks.push(Task {
            name: name.to_string(),
            prerequisites: declared,
            group: group.map(str::to_string),
            action,
        });

        tracing::debug!(task = name, "registered task");
        Ok(())
    }

    /// Depth-first walk from the candidate through its prerequisite edges.
    /// Returns the path back to the candidate if one exists.
    fn find_cycle(&self, name: &str, prerequisites: &[String]) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Vec<String>> = prerequisites
            .iter()
            .rev()
            .map(|p| vec![name.to_string(), p.clone()])
            .collect();

        while let Some(mut path) = stack.pop() {
            let current = path.last()?.clone();
            if current == name {
                path.pop();
                return Some(path);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(&node) = self.index.get(&current) {
                for neighbor in self.graph.neighbors(node) {
                    let mut next = path.clone();
                    next.push(self.graph[neighbor].clone());
                    stack.push(next);
                }
            }
        }

        None
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|node| &self.tasks[node.index()])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registration position of a task, used to break ties deterministically
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|node| node.index())
    }

    /// Tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(Task::name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks that list `name` as a direct prerequisite, in registration order
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        let mut dependents: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        dependents.sort();
        dependents
            .into_iter()
            .map(|n| self.graph[n].as_str())
            .collect()
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tasks.iter()).finish()
    }
}
