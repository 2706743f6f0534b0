//! Filesystem change events
//!
//! ```text
//! notify debouncer -> ChangeEvent (relative path) -> mpsc -> WatchSession
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use crate::types::DroverResult;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The path exists after the change: created or written
    Modified,
    Removed,
}

/// A change to a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Debounced recursive watcher over the workspace root.
///
/// Events stop flowing once this value is dropped.
pub struct FsEventSource {
    _debouncer: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl FsEventSource {
    /// Start watching `root`, returning the source and its event stream.
    /// Repeated changes to one path within `debounce` arrive as one event.
    pub fn start(
        root: &Path,
        debounce: Duration,
    ) -> DroverResult<(Self, mpsc::Receiver<ChangeEvent>)> {
        let root = root.canonicalize()?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let watch_root = root.clone();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(error) => {
                    tracing::warn!(%error, "file watcher error");
                    return;
                }
            };
            for event in events {
                // Receiver gone means the session has ended
                if event_tx
                    .blocking_send(to_change_event(&event.path, &watch_root))
                    .is_err()
                {
                    return;
                }
            }
        })?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(root = %root.display(), debounce = ?debounce, "watching for changes");
        Ok((
            Self {
                _debouncer: debouncer,
                root,
            },
            event_rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Root-relative change event. Debounced events carry no kind, so whether the
/// path still exists decides between a modification and a removal.
fn to_change_event(path: &Path, root: &Path) -> ChangeEvent {
    let kind = if path.exists() {
        ChangeKind::Modified
    } else {
        ChangeKind::Removed
    };
    let relative = path.strip_prefix(root).unwrap_or(path);
    ChangeEvent::new(relative, kind)
}
