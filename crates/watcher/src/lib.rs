//! Directory watching for seqwatch
//!
//! This crate provides:
//! - One directory watcher per root with a lock-guarded registry
//! - Growth/debounce policy deciding when a file is worth re-reading
//! - Request/acknowledgment handshakes with per-file streaming sessions
//! - A root coordinator merging every root into one record stream

pub mod control;
pub mod coordinator;
pub mod debounce;
pub mod diagnostics;
pub mod directory;
pub mod discover;
pub mod error;
pub mod pattern;
pub mod platform;
pub mod reconcile;
pub mod registry;


pub use control::RootSignal;
pub use coordinator::{
    usable_roots, Coordinator, CoordinatorOptions, ProcessProbe, RecordSink, RunSummary,
    StopReason,
};
pub use debounce::{GrowthPolicy, IgnoreReason, WriteDecision};
pub use diagnostics::{Diagnostics, TracingDiagnostics, WatchNote};
pub use directory::{DirectoryWatcher, Flow, WatchOptions};
pub use error::{CoordinatorError, SourceError, WatchError};
pub use pattern::NameFilter;
pub use platform::{ChangeSource, ManualHandle, ManualSource, NativeSource};

use std::path::PathBuf;

/// File system change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Path created
    Create,
    /// File contents written
    Write,
    /// Path deleted
    Remove,
    /// Path renamed away (the new name is not reported)
    Rename,
}
