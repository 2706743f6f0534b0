//! Task execution module
//!
//! This module handles plan building, wave execution with partial-failure
//! reporting, and the built-in command and removal actions.

pub mod command;
pub mod plan;
pub mod runner;

pub use command::{CommandAction, CommandSpec, RemoveAction};
pub use plan::{build_plan, ExecutionPlan};
pub use runner::{Executor, RunReport, RunResult, TaskOutcome};
