//! High-level orchestration interface
//!
//! This module provides the [`Orchestrator`] which serves as the primary
//! interface for run requests. It owns the task registry built at startup and
//! exposes the operations a front end needs:
//!
//! - Running the default task set or named tasks
//! - The clean-then-build full rebuild sequence
//! - Watch mode, re-running bound tasks on change events
//! - Plans and task listings for dry runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use drover_core::orchestrator::{Orchestrator, OrchestratorConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> drover_core::types::DroverResult<()> {
//! let orchestrator = Orchestrator::load(OrchestratorConfig {
//!     workspace_root: PathBuf::from("."),
//!     config_path: None,
//! })?;
//!
//! // Build everything from scratch
//! let report = orchestrator.run_full_rebuild().await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::configs::pipeline::{parse_pipeline_config, PipelineConfig};
use crate::execution::plan::{build_plan, ExecutionPlan};
use crate::execution::runner::{Executor, RunReport};
use crate::pipeline::{build_bindings, build_registry};
use crate::registry::TaskRegistry;
use crate::results::{PlanResult, TaskInfo, TaskListResult};
use crate::tasks::get_task_colors;
use crate::types::{DroverError, DroverResult};
use crate::watch::{ChangeEvent, FsEventSource, WatchBinding, WatchRun, WatchSession, WatchSummary};

/// Default pipeline file name, looked up in the workspace root
pub const PIPELINE_FILE: &str = "drover.yml";

/// Name of the clean task when the pipeline does not configure a rebuild
pub const DEFAULT_CLEAN_TASK: &str = "clean";

/// Group tag that marks the tasks of a full build
pub const BUILD_GROUP: &str = "build";

/// Quiet period before a watch run starts when the pipeline sets none
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Configuration for loading an orchestrator from a pipeline file
pub struct OrchestratorConfig {
    pub workspace_root: PathBuf,
    /// Pipeline file, defaults to `drover.yml` in the workspace root
    pub config_path: Option<PathBuf>,
}

/// Clean task followed by the build task set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullRebuild {
    pub clean: String,
    pub build: Vec<String>,
}

/// Orchestrator that owns the registry and serves run requests
pub struct Orchestrator {
    root: PathBuf,
    registry: Arc<TaskRegistry>,
    executor: Executor,
    bindings: Arc<[WatchBinding]>,
    watch_debounce: Duration,
    default_tasks: Vec<String>,
    /// Set once the default set was chosen explicitly
    default_pinned: bool,
    rebuild: Option<FullRebuild>,
    descriptions: HashMap<String, String>,
}

impl Orchestrator {
    /// Wrap a registry built by the caller.
    ///
    /// The default task set is every task in the `build` group, or every task
    /// when no task carries that group. A task named `clean` is never part of
    /// it; it only runs when asked for or as the first rebuild phase.
    pub fn new(root: &Path, registry: TaskRegistry) -> Self {
        let registry = Arc::new(registry);
        let default_tasks = build_group_or(&registry, |name| name != DEFAULT_CLEAN_TASK);
        Self {
            root: root.to_path_buf(),
            executor: Executor::new(Arc::clone(&registry)),
            registry,
            bindings: Arc::from(Vec::new()),
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            default_tasks,
            default_pinned: false,
            rebuild: None,
            descriptions: HashMap::new(),
        }
    }

    /// Load the pipeline file described by `config`
    pub fn load(config: OrchestratorConfig) -> DroverResult<Self> {
        let config_path = config
            .config_path
            .unwrap_or_else(|| config.workspace_root.join(PIPELINE_FILE));
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            DroverError::Config(format!(
                "Failed to read pipeline config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let pipeline = parse_pipeline_config(&content).map_err(|e| {
            DroverError::Config(format!(
                "Failed to parse pipeline config {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_pipeline(&config.workspace_root, &pipeline)
    }

    /// Build an orchestrator from an already parsed pipeline
    pub fn from_pipeline(root: &Path, pipeline: &PipelineConfig) -> DroverResult<Self> {
        let registry = build_registry(root, pipeline)?;
        let bindings = build_bindings(&registry, pipeline.watch.as_deref().unwrap_or_default())?;

        let mut orchestrator = Self::new(root, registry).with_watch_bindings(bindings)?;
        if let Some(ms) = pipeline.watch_debounce_ms {
            orchestrator = orchestrator.with_watch_debounce(Duration::from_millis(ms));
        }

        orchestrator = match &pipeline.rebuild {
            Some(rebuild) => match &rebuild.build {
                Some(build) => orchestrator.with_full_rebuild(&rebuild.clean, build.clone())?,
                None => {
                    let clean = rebuild.clean.clone();
                    let build = build_group_or(&orchestrator.registry, |name| name != clean);
                    orchestrator.with_full_rebuild(&rebuild.clean, build)?
                }
            },
            None if orchestrator.registry.contains(DEFAULT_CLEAN_TASK) => {
                let build =
                    build_group_or(&orchestrator.registry, |name| name != DEFAULT_CLEAN_TASK);
                orchestrator.with_full_rebuild(DEFAULT_CLEAN_TASK, build)?
            }
            None => orchestrator,
        };

        if let Some(default) = &pipeline.default {
            orchestrator = orchestrator.with_default_tasks(default.clone())?;
        }

        orchestrator.descriptions = pipeline
            .tasks
            .iter()
            .filter_map(|task| Some((task.name.clone(), task.description.clone()?)))
            .collect();

        tracing::debug!(
            tasks = orchestrator.registry.len(),
            bindings = orchestrator.bindings.len(),
            "loaded pipeline"
        );
        Ok(orchestrator)
    }

    pub fn with_default_tasks(mut self, names: Vec<String>) -> DroverResult<Self> {
        self.ensure_registered(&names)?;
        self.default_tasks = names;
        self.default_pinned = true;
        Ok(self)
    }

    pub fn with_watch_bindings(mut self, bindings: Vec<WatchBinding>) -> DroverResult<Self> {
        for binding in &bindings {
            self.ensure_registered(binding.tasks())?;
        }
        self.bindings = bindings.into();
        Ok(self)
    }

    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Configure the clean-then-build sequence. Unless a default set was
    /// chosen explicitly, the build set also becomes the default so the clean
    /// task never runs next to the build it precedes.
    pub fn with_full_rebuild(mut self, clean: &str, build: Vec<String>) -> DroverResult<Self> {
        self.ensure_registered(&[clean.to_string()])?;
        self.ensure_registered(&build)?;
        if !self.default_pinned {
            self.default_tasks = build.clone();
        }
        self.rebuild = Some(FullRebuild {
            clean: clean.to_string(),
            build,
        });
        Ok(self)
    }

    fn ensure_registered(&self, names: &[String]) -> DroverResult<()> {
        match names.iter().find(|name| !self.registry.contains(name)) {
            Some(missing) => Err(DroverError::UnknownTask(missing.clone())),
            None => Ok(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    pub fn default_tasks(&self) -> &[String] {
        &self.default_tasks
    }

    pub fn full_rebuild(&self) -> Option<&FullRebuild> {
        self.rebuild.as_ref()
    }

    pub fn watch_debounce(&self) -> Duration {
        self.watch_debounce
    }

    /// Execution plan for the named tasks, or the default set when empty
    pub fn plan<S: AsRef<str>>(&self, names: &[S]) -> DroverResult<PlanResult> {
        let plan = if names.is_empty() {
            build_plan(&self.registry, &self.default_tasks)?
        } else {
            build_plan(&self.registry, names)?
        };
        let task_colors = get_task_colors(plan.task_names());
        Ok(PlanResult { plan, task_colors })
    }

    pub async fn run_default(&self) -> DroverResult<RunReport> {
        self.run_named(&self.default_tasks).await
    }

    pub async fn run_named<S: AsRef<str>>(&self, names: &[S]) -> DroverResult<RunReport> {
        let plan = build_plan(&self.registry, names)?;
        tracing::info!(tasks = plan.len(), waves = plan.waves().len(), "running tasks");
        Ok(self.executor.run(&plan).await)
    }

    /// The two phases of a full rebuild: clean, then build
    pub fn rebuild_phases(&self) -> DroverResult<Vec<ExecutionPlan>> {
        let rebuild = self.rebuild.as_ref().ok_or_else(|| {
            DroverError::Config(format!(
                "No rebuild sequence configured and no '{}' task registered",
                DEFAULT_CLEAN_TASK
            ))
        })?;

        Ok(vec![
            build_plan(&self.registry, std::slice::from_ref(&rebuild.clean))?,
            build_plan(&self.registry, &rebuild.build)?,
        ])
    }

    /// Clean, then build everything. If the clean phase does not succeed the
    /// build phase is skipped entirely.
    pub async fn run_full_rebuild(&self) -> DroverResult<RunReport> {
        let phases = self.rebuild_phases()?;
        tracing::info!("running full rebuild");
        Ok(self.executor.run_phases(&phases).await)
    }

    /// Re-run bound tasks for every change received on `events` until the
    /// sender side closes
    pub async fn start_watch<F>(&self, events: mpsc::Receiver<ChangeEvent>, on_run: F) -> WatchSummary
    where
        F: FnMut(&WatchRun) + Send,
    {
        WatchSession::new(Arc::clone(&self.registry), Arc::clone(&self.bindings))
            .with_debounce(self.watch_debounce)
            .run(events, on_run)
            .await
    }

    /// Start a filesystem watcher over the workspace root
    pub fn watch_workspace(&self) -> DroverResult<(FsEventSource, mpsc::Receiver<ChangeEvent>)> {
        if self.bindings.is_empty() {
            return Err(DroverError::Watch("No watch bindings configured".to_string()));
        }
        FsEventSource::start(&self.root, self.watch_debounce)
    }

    /// Describe every registered task
    pub fn list_tasks(&self) -> TaskListResult {
        let tasks: Vec<TaskInfo> = self
            .registry
            .tasks()
            .map(|task| TaskInfo {
                name: task.name().to_string(),
                description: self.descriptions.get(task.name()).cloned(),
                group: task.group().map(str::to_string),
                prerequisites: task.prerequisites().to_vec(),
                dependents: self
                    .registry
                    .dependents_of(task.name())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                watched_by: self
                    .bindings
                    .iter()
                    .filter(|b| b.tasks().iter().any(|t| t == task.name()))
                    .flat_map(|b| b.patterns().iter().cloned())
                    .collect(),
                is_default: self.default_tasks.iter().any(|t| t == task.name()),
            })
            .collect();

        TaskListResult {
            task_colors: get_task_colors(tasks.iter().map(|t| t.name.as_str())),
            tasks,
        }
    }
}

/// Tasks in the build group that pass `keep`, or every task passing `keep`
/// when no task is in the build group
fn build_group_or(registry: &TaskRegistry, keep: impl Fn(&str) -> bool) -> Vec<String> {
    let grouped: Vec<String> = registry
        .tasks()
        .filter(|task| task.group() == Some(BUILD_GROUP) && keep(task.name()))
        .map(|task| task.name().to_string())
        .collect();

    if !grouped.is_empty() {
        return grouped;
    }

    registry
        .names()
        .filter(|name| keep(name))
        .map(str::to_string)
        .collect()
}
