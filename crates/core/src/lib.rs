//! Drover Core Library
//!
//! This is the core library for the Drover build task orchestrator. It runs
//! named tasks with declared prerequisites in dependency order, keeps going
//! past failures that do not affect a branch, re-runs tasks on file changes,
//! and sequences clean-then-build rebuilds.
//!
//! ## Architecture
//!
//! The core library is organized into several modules:
//!
//! - [`orchestrator`] - High-level interface serving run requests
//! - [`registry`] - Task registration with cycle and reference checks
//! - [`execution`] - Plan building, wave execution and built-in actions
//! - [`watch`] - Change-triggered re-runs and the filesystem event source
//! - [`pipeline`] - Building a registry and watch bindings from a pipeline file
//! - [`configs`] - Configuration parsing for pipeline files
//! - [`action`] - The task action trait
//! - [`results`] - Result types for orchestrator queries
//! - [`tasks`] - Task color management
//! - [`types`] - Common error types and type aliases
//!
//! ## Usage
//!
//! Tasks can be registered directly and handed to an [`Orchestrator`]:
//!
//! ```rust,no_run
//! use drover_core::registry::TaskRegistry;
//! use drover_core::Orchestrator;
//! use std::path::Path;
//!
//! # async fn example() -> drover_core::types::DroverResult<()> {
//! let mut registry = TaskRegistry::new();
//! registry.register("styles", &[], || async { Ok(()) })?;
//! registry.register("bundle", &["styles"], || async { Ok(()) })?;
//!
//! let orchestrator = Orchestrator::new(Path::new("."), registry);
//! let report = orchestrator.run_named(&["bundle"]).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod configs;
pub mod execution;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod results;
pub mod tasks;
pub mod types;
pub mod watch;

// Re-export the main types for easier usage
pub use action::TaskAction;
pub use execution::{RunReport, RunResult};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use types::{DroverError, DroverResult};
