//! Decision-point diagnostics for directory watchers
//!
//! Watchers report what they decided through an injected [`Diagnostics`]
//! sink instead of logging inline, so tests can assert on decisions.

use crate::debounce::IgnoreReason;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One watcher decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchNote {
    RootLaunched { path: PathBuf },
    DirectoryWatched { path: PathBuf },
    DirectoryRemoved { path: PathBuf },
    DirectoryUnwatched { path: PathBuf },
    FileWatched { path: PathBuf, size: u64 },
    FileSkipped { path: PathBuf },
    RereadIssued { path: PathBuf, size: u64 },
    WriteIgnored { path: PathBuf, reason: IgnoreReason },
    FileTruncated { path: PathBuf, size: u64 },
    FileRemoved { path: PathBuf },
    FileRenamed { path: PathBuf },
    FileUnwatched { path: PathBuf },
    SessionExited { path: PathBuf },
    SessionOpenFailed { path: PathBuf, error: String },
    RootGone { path: PathBuf },
    ShutdownBegun,
    ShutdownComplete,
}

/// Receives watcher decisions
pub trait Diagnostics: Send + Sync {
    fn note(&self, root: usize, note: WatchNote);
}

/// Forwards every note to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn note(&self, root: usize, note: WatchNote) {
        match note {
            WatchNote::RootLaunched { path } => {
                info!(root, "Watcher launched on root: {}", path.display())
            }
            WatchNote::DirectoryWatched { path } => {
                info!(root, "Watching directory: {}", path.display())
            }
            WatchNote::DirectoryRemoved { path } => {
                info!(root, "Removed directory: {}", path.display())
            }
            WatchNote::DirectoryUnwatched { path } => {
                info!(root, "Stopped watching directory: {}", path.display())
            }
            WatchNote::FileWatched { path, size } => {
                info!(root, size, "Watching file: {}", path.display())
            }
            WatchNote::FileSkipped { path } => debug!(root, "Skip: {}", path.display()),
            WatchNote::RereadIssued { path, size } => {
                debug!(root, size, "Re-reading: {}", path.display())
            }
            WatchNote::WriteIgnored { path, reason } => {
                debug!(root, ?reason, "Write ignored: {}", path.display())
            }
            WatchNote::FileTruncated { path, size } => {
                info!(root, size, "Stopped watching truncated file: {}", path.display())
            }
            WatchNote::FileRemoved { path } => info!(root, "Removed file: {}", path.display()),
            WatchNote::FileRenamed { path } => {
                info!(root, "Stopped watching renamed file: {}", path.display())
            }
            WatchNote::FileUnwatched { path } => {
                info!(root, "Stopped watching file: {}", path.display())
            }
            WatchNote::SessionExited { path } => {
                warn!(root, "Session closed on its own: {}", path.display())
            }
            WatchNote::SessionOpenFailed { path, error } => {
                warn!(root, "Cannot stream {}: {}", path.display(), error)
            }
            WatchNote::RootGone { path } => {
                warn!(root, "Watch root disappeared: {}", path.display())
            }
            WatchNote::ShutdownBegun => debug!(root, "Shutting down watcher"),
            WatchNote::ShutdownComplete => info!(root, "Exiting."),
        }
    }
}
