//! Watch mode
//!
//! Change events are matched against [`WatchBinding`]s and the bound tasks
//! re-run through a [`WatchSession`], which never lets two runs overlap.

pub mod binding;
pub mod events;
pub mod session;

pub use binding::WatchBinding;
pub use events::{ChangeEvent, ChangeKind, FsEventSource};
pub use session::{WatchRun, WatchSession, WatchState, WatchSummary};
