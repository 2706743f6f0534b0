//! Change-triggered re-runs
//!
//! The session is a two-state machine. While `Idle`, a change that matches a
//! binding starts a run of the bound tasks. While `Running`, matching changes
//! only mark their binding as pending; once the run finishes every pending
//! binding is folded into a single follow-up run. Runs never overlap, so two
//! writers never race on the same output files.
//!
//! Before leaving `Idle` the session waits until no change has arrived for
//! one debounce window, so a burst of events from a single save starts one
//! run rather than several.

use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::execution::plan::build_plan;
use crate::execution::runner::{Executor, RunReport};
use crate::registry::TaskRegistry;
use crate::types::{DroverError, DroverResult};
use crate::watch::binding::WatchBinding;
use crate::watch::events::ChangeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Running,
}

/// One change-triggered run
#[derive(Debug)]
pub struct WatchRun {
    pub tasks: Vec<String>,
    pub outcome: DroverResult<RunReport>,
}

impl WatchRun {
    pub fn is_success(&self) -> bool {
        self.outcome.as_ref().is_ok_and(RunReport::is_success)
    }
}

/// Counters reported when the event source closes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub runs: usize,
    pub failed_runs: usize,
    pub ignored_events: usize,
    pub coalesced_events: usize,
}

pub struct WatchSession {
    registry: Arc<TaskRegistry>,
    bindings: Arc<[WatchBinding]>,
    executor: Executor,
    debounce: Duration,
    state: WatchState,
    pending: BTreeSet<usize>,
    summary: WatchSummary,
}

impl WatchSession {
    pub fn new(registry: Arc<TaskRegistry>, bindings: Arc<[WatchBinding]>) -> Self {
        Self {
            executor: Executor::new(Arc::clone(&registry)),
            registry,
            bindings,
            debounce: Duration::ZERO,
            state: WatchState::Idle,
            pending: BTreeSet::new(),
            summary: WatchSummary::default(),
        }
    }

    /// Quiet period required before a run starts. Zero starts runs at once.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Consume change events until the source closes.
    ///
    /// `on_run` is called after every run. Failed runs and plan errors are
    /// reported through it and never end the session. Pending re-runs are
    /// still carried out after the source closes.
    pub async fn run<F>(mut self, mut events: mpsc::Receiver<ChangeEvent>, mut on_run: F) -> WatchSummary
    where
        F: FnMut(&WatchRun) + Send,
    {
        let mut open = true;

        loop {
            if self.pending.is_empty() {
                if !open {
                    break;
                }
                match events.recv().await {
                    Some(event) => self.enqueue(&event),
                    None => open = false,
                }
                continue;
            }

            self.settle(&mut events, &mut open).await;

            let tasks = self.take_pending_tasks();
            self.state = WatchState::Running;
            tracing::info!(tasks = ?tasks, "change detected, running tasks");

            let registry = Arc::clone(&self.registry);
            let executor = self.executor.clone();
            let requested = tasks.clone();
            let run = async move {
                let plan = build_plan(&registry, &requested)?;
                Ok::<_, DroverError>(executor.run(&plan).await)
            };
            tokio::pin!(run);

            let outcome: DroverResult<RunReport> = loop {
                tokio::select! {
                    outcome = &mut run => break outcome,
                    event = events.recv(), if open => match event {
                        Some(event) => self.enqueue(&event),
                        None => open = false,
                    },
                }
            };

            // Changes buffered while the run was finishing belong to this run's window
            while open {
                match events.try_recv() {
                    Ok(event) => self.enqueue(&event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => open = false,
                }
            }

            self.state = WatchState::Idle;
            let run = WatchRun { tasks, outcome };
            self.summary.runs += 1;
            if !run.is_success() {
                self.summary.failed_runs += 1;
                match &run.outcome {
                    Ok(report) => tracing::warn!(
                        failed = report.failed_count(),
                        skipped = report.skipped_count(),
                        "watch run finished with failures"
                    ),
                    Err(error) => tracing::warn!(%error, "watch run could not be planned"),
                }
            }
            on_run(&run);
        }

        tracing::info!(runs = self.summary.runs, "watch session ended");
        self.summary
    }

    /// Keep collecting changes until one debounce window passes without any
    async fn settle(&mut self, events: &mut mpsc::Receiver<ChangeEvent>, open: &mut bool) {
        if self.debounce.is_zero() {
            return;
        }
        while *open {
            match tokio::time::timeout(self.debounce, events.recv()).await {
                Ok(Some(event)) => self.enqueue(&event),
                Ok(None) => *open = false,
                Err(_) => break,
            }
        }
    }

    fn enqueue(&mut self, event: &ChangeEvent) {
        let mut matched = false;
        for (index, binding) in self.bindings.iter().enumerate() {
            if binding.matches(&event.path) {
                matched = true;
                if !self.pending.insert(index) {
                    self.summary.coalesced_events += 1;
                }
            }
        }

        if matched {
            tracing::debug!(path = %event.path.display(), kind = ?event.kind, state = ?self.state, "queued change");
        } else {
            self.summary.ignored_events += 1;
        }
    }

    /// Union of the tasks bound to every pending binding, first mention first
    fn take_pending_tasks(&mut self) -> Vec<String> {
        let mut tasks: Vec<String> = Vec::new();
        for index in mem::take(&mut self.pending) {
            for task in self.bindings[index].tasks() {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::events::ChangeKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn modified(path: &str) -> ChangeEvent {
        ChangeEvent::new(path, ChangeKind::Modified)
    }

    fn bindings(list: Vec<WatchBinding>) -> Arc<[WatchBinding]> {
        list.into()
    }

    #[tokio::test]
    async fn test_events_during_run_coalesce_into_one_rerun() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());

        let mut registry = TaskRegistry::new();
        {
            let calls = Arc::clone(&calls);
            let started = Arc::clone(&started);
            let gate = Arc::clone(&gate);
            registry
                .register("styles", &[], move || {
                    let calls = Arc::clone(&calls);
                    let started = Arc::clone(&started);
                    let gate = Arc::clone(&gate);
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            started.notify_one();
                            gate.notified().await;
                        }
                        Ok::<(), anyhow::Error>(())
                    }
                })
                .unwrap();
        }

        let session = WatchSession::new(
            Arc::new(registry),
            bindings(vec![WatchBinding::new(&["src/scss/**/*.scss"], vec!["styles".to_string()]).unwrap()]),
        );
        assert_eq!(session.state(), WatchState::Idle);

        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(session.run(rx, |_| {}));

        tx.send(modified("src/scss/main.scss")).await.unwrap();
        started.notified().await;
        tx.send(modified("src/scss/_vars.scss")).await.unwrap();
        tx.send(modified("src/scss/main.scss")).await.unwrap();
        gate.notify_one();
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.coalesced_events, 1);
        assert_eq!(summary.failed_runs, 0);
    }

    #[tokio::test]
    async fn test_failed_run_returns_to_idle_and_unmatched_events_are_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = TaskRegistry::new();
        {
            let calls = Arc::clone(&calls);
            registry
                .register("js", &[], move || {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 0 {
                            anyhow::bail!("syntax error in main.js");
                        }
                        Ok(())
                    }
                })
                .unwrap();
        }

        let session = WatchSession::new(
            Arc::new(registry),
            bindings(vec![WatchBinding::new(&["src/js/**/*.js"], vec!["js".to_string()]).unwrap()]),
        );

        let (tx, rx) = mpsc::channel(16);
        tx.send(modified("src/js/main.js")).await.unwrap();
        tx.send(modified("README.md")).await.unwrap();
        tx.send(modified("src/js/main.js")).await.unwrap();
        drop(tx);

        let mut outcomes = Vec::new();
        let summary = session.run(rx, |run| outcomes.push(run.is_success())).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(summary.failed_runs, 1);
        assert_eq!(summary.ignored_events, 1);
    }

    #[tokio::test]
    async fn test_pending_bindings_merge_into_single_plan() {
        let base = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());

        let mut registry = TaskRegistry::new();
        {
            let base = Arc::clone(&base);
            registry
                .register("vendor", &[], move || {
                    base.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<(), anyhow::Error>(()) }
                })
                .unwrap();
        }
        {
            let started = Arc::clone(&started);
            let gate = Arc::clone(&gate);
            registry
                .register("html", &[], move || {
                    let started = Arc::clone(&started);
                    let gate = Arc::clone(&gate);
                    async move {
                        started.notify_one();
                        gate.notified().await;
                        Ok::<(), anyhow::Error>(())
                    }
                })
                .unwrap();
        }
        registry.register("styles", &["vendor"], crate::action::NoopAction).unwrap();
        registry.register("js", &["vendor"], crate::action::NoopAction).unwrap();

        let session = WatchSession::new(
            Arc::new(registry),
            bindings(vec![
                WatchBinding::new(&["src/*.html"], vec!["html".to_string()]).unwrap(),
                WatchBinding::new(&["src/scss/**"], vec!["styles".to_string()]).unwrap(),
                WatchBinding::new(&["src/js/**"], vec!["js".to_string()]).unwrap(),
            ]),
        );

        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move {
            let mut runs = Vec::new();
            session.run(rx, |run| runs.push(run.tasks.clone())).await;
            runs
        });

        tx.send(modified("src/index.html")).await.unwrap();
        started.notified().await;
        tx.send(modified("src/scss/main.scss")).await.unwrap();
        tx.send(modified("src/js/main.js")).await.unwrap();
        gate.notify_one();
        drop(tx);

        let runs = handle.await.unwrap();
        assert_eq!(
            runs,
            vec![
                vec!["html".to_string()],
                vec!["styles".to_string(), "js".to_string()],
            ]
        );
        assert_eq!(base.load(Ordering::SeqCst), 1);
    }

    fn counted_styles(calls: &Arc<AtomicUsize>) -> TaskRegistry {
        let calls = Arc::clone(calls);
        let mut registry = TaskRegistry::new();
        registry
            .register("styles", &[], move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), anyhow::Error>(()) }
            })
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_burst_from_one_save_starts_a_single_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = WatchSession::new(
            Arc::new(counted_styles(&calls)),
            bindings(vec![WatchBinding::new(&["src/scss/**/*.scss"], vec!["styles".to_string()]).unwrap()]),
        )
        .with_debounce(Duration::from_millis(50));

        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(session.run(rx, |_| {}));

        tx.send(modified("src/scss/main.scss")).await.unwrap();
        tx.send(modified("src/scss/main.scss")).await.unwrap();
        tx.send(modified("src/scss/_vars.scss")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.runs, 1);
        assert_eq!(summary.coalesced_events, 2);
    }

    #[tokio::test]
    async fn test_changes_after_quiet_window_start_a_new_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = WatchSession::new(
            Arc::new(counted_styles(&calls)),
            bindings(vec![WatchBinding::new(&["src/scss/**/*.scss"], vec!["styles".to_string()]).unwrap()]),
        )
        .with_debounce(Duration::from_millis(20));

        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(session.run(rx, |_| {}));

        tx.send(modified("src/scss/main.scss")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(modified("src/scss/main.scss")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.coalesced_events, 0);
    }

    #[tokio::test]
    async fn test_plan_error_does_not_end_session() {
        let session = WatchSession::new(
            Arc::new(TaskRegistry::new()),
            bindings(vec![WatchBinding::new(&["src/**"], vec!["missing".to_string()]).unwrap()]),
        );

        let (tx, rx) = mpsc::channel(4);
        tx.send(modified("src/a.txt")).await.unwrap();
        tx.send(modified("src/b.txt")).await.unwrap();
        drop(tx);

        let mut errors = 0;
        let summary = session
            .run(rx, |run| {
                if matches!(run.outcome, Err(DroverError::UnknownTask(_))) {
                    errors += 1;
                }
            })
            .await;

        assert_eq!(errors, 2);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.failed_runs, 2);
    }
}
