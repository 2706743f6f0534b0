//! Result types for orchestrator operations
//!
//! This module contains the result types returned by [`Orchestrator`](crate::orchestrator::Orchestrator)
//! queries, providing a centralized location for output structures.

use std::collections::HashMap;

use colored::Color;

use crate::execution::plan::ExecutionPlan;

/// Information about a registered task
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub group: Option<String>,
    pub prerequisites: Vec<String>,
    pub dependents: Vec<String>,
    /// Patterns of the watch bindings that re-run this task
    pub watched_by: Vec<String>,
    pub is_default: bool,
}

/// Result of listing the registered tasks, in registration order
#[derive(Debug)]
pub struct TaskListResult {
    pub tasks: Vec<TaskInfo>,
    pub task_colors: HashMap<String, Color>,
}

/// Result of execution planning
#[derive(Debug)]
pub struct PlanResult {
    pub plan: ExecutionPlan,
    pub task_colors: HashMap<String, Color>,
}
