//! Wave executor
//!
//! This module drives an [`ExecutionPlan`]: every task of a wave is spawned on
//! the runtime, the wave is joined, and only then does the next wave start.
//! Failures are recorded per task and propagate to dependents as skips.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::execution::plan::ExecutionPlan;
use crate::registry::TaskRegistry;

/// Terminal state of a single task within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Succeeded,
    Failed(String),
    /// Not invoked because `prerequisite` did not succeed
    Skipped { prerequisite: String },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunResult::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunResult::Skipped { .. })
    }
}

/// Result of one task together with how long its action ran
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub result: RunResult,
    pub elapsed: Duration,
}

/// Mapping of task name to result, kept in execution order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    outcomes: Vec<TaskOutcome>,
    index: HashMap<String, usize>,
}

impl RunReport {
    pub fn get(&self, name: &str) -> Option<&RunResult> {
        self.index.get(name).map(|i| &self.outcomes[*i].result)
    }

    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when every task in the run succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.count(RunResult::is_success)
    }

    pub fn failed_count(&self) -> usize {
        self.count(RunResult::is_failure)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(RunResult::is_skipped)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_failure())
    }

    fn count(&self, predicate: fn(&RunResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.result)).count()
    }

    fn record(&mut self, name: &str, result: RunResult, elapsed: Duration) {
        self.index.insert(name.to_string(), self.outcomes.len());
        self.outcomes.push(TaskOutcome {
            name: name.to_string(),
            result,
            elapsed,
        });
    }

    /// Name of the first prerequisite that did not succeed, if any
    fn blocking_prerequisite<'a>(&self, prerequisites: &'a [String]) -> Option<&'a String> {
        prerequisites
            .iter()
            .find(|p| self.get(p).is_some_and(|result| !result.is_success()))
    }
}

enum Slot {
    Resolved(RunResult),
    Spawned(usize),
}

type ActionHandle = JoinHandle<(anyhow::Result<()>, Duration)>;

/// Runs execution plans against a registry
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<TaskRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    /// Run a single plan wave by wave
    pub async fn run(&self, plan: &ExecutionPlan) -> RunReport {
        self.run_phases(std::slice::from_ref(plan)).await
    }

    /// Run plans as phases separated by a hard barrier.
    ///
    /// Once a phase has a task that did not succeed, no action of any later
    /// phase is invoked; those tasks are reported as skipped on the first
    /// unsuccessful task of the blocking phase. Tasks already resolved by an
    /// earlier phase are not run again.
    pub async fn run_phases(&self, phases: &[ExecutionPlan]) -> RunReport {
        let mut report = RunReport::default();
        let mut barrier: Option<String> = None;

        for (phase, plan) in phases.iter().enumerate() {
            if let Some(blocker) = &barrier {
                for name in plan.task_names() {
                    if report.get(name).is_none() {
                        report.record(
                            name,
                            RunResult::Skipped {
                                prerequisite: blocker.clone(),
                            },
                            Duration::ZERO,
                        );
                    }
                }
                continue;
            }

            self.run_plan(plan, &mut report).await;

            barrier = plan
                .task_names()
                .find(|name| report.get(name).is_some_and(|r| !r.is_success()))
                .map(str::to_string);

            if let Some(blocker) = &barrier {
                if phase + 1 < phases.len() {
                    tracing::warn!(phase, blocker = %blocker, "phase did not succeed, later phases skipped");
                }
            }
        }

        report
    }

    async fn run_plan(&self, plan: &ExecutionPlan, report: &mut RunReport) {
        for (wave_index, wave) in plan.waves().iter().enumerate() {
            let wave_started = Instant::now();
            let mut slots: Vec<(&str, Slot)> = Vec::with_capacity(wave.len());
            let mut handles: Vec<ActionHandle> = Vec::new();

            for name in wave {
                if report.get(name).is_some() {
                    continue;
                }

                let Some(task) = self.registry.get(name) else {
                    slots.push((
                        name.as_str(),
                        Slot::Resolved(RunResult::Failed(format!("Task '{}' not found", name))),
                    ));
                    continue;
                };

                if let Some(blocker) = report.blocking_prerequisite(task.prerequisites()) {
                    tracing::info!(task = %name, prerequisite = %blocker, "skipping task");
                    slots.push((
                        name.as_str(),
                        Slot::Resolved(RunResult::Skipped {
                            prerequisite: blocker.clone(),
                        }),
                    ));
                    continue;
                }

                tracing::info!(task = %name, wave = wave_index, "starting task");
                let action = task.action();
                slots.push((name.as_str(), Slot::Spawned(handles.len())));
                handles.push(tokio::spawn(async move {
                    let started = Instant::now();
                    let result = action.run().await;
                    (result, started.elapsed())
                }));
            }

            let mut joined: Vec<Option<(RunResult, Duration)>> = join_all(handles)
                .await
                .into_iter()
                .map(|outcome| {
                    Some(match outcome {
                        Ok((Ok(()), elapsed)) => (RunResult::Succeeded, elapsed),
                        Ok((Err(error), elapsed)) => {
                            (RunResult::Failed(format!("{:#}", error)), elapsed)
                        }
                        Err(join_error) => (
                            RunResult::Failed(format!("action aborted: {}", join_error)),
                            wave_started.elapsed(),
                        ),
                    })
                })
                .collect();

            for (name, slot) in slots {
                let (result, elapsed) = match slot {
                    Slot::Resolved(result) => (result, Duration::ZERO),
                    Slot::Spawned(i) => match joined[i].take() {
                        Some(outcome) => outcome,
                        None => continue,
                    },
                };

                match &result {
                    RunResult::Succeeded => {
                        tracing::info!(task = %name, elapsed = ?elapsed, "task succeeded")
                    }
                    RunResult::Failed(reason) => {
                        tracing::warn!(task = %name, reason = %reason, "task failed")
                    }
                    RunResult::Skipped { .. } => {}
                }
                report.record(name, result, elapsed);
            }
        }
    }
}
