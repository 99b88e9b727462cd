//! Error types for watchers and the root coordinator

use crate::control::RootSignal;
use scat_core::StreamSignal;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a change notification source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("{0}")]
    Other(String),
}

/// Fatal directory watcher failures
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("change notification error: {0}")]
    Source(#[from] SourceError),

    #[error("session for {path} answered {signal} while {context}")]
    Protocol {
        path: PathBuf,
        signal: StreamSignal,
        context: &'static str,
    },

    #[error("session for {path} disappeared without acknowledging")]
    SessionLost { path: PathBuf },

    #[error("unexpected control signal {0:?}")]
    Control(RootSignal),
}

/// Fatal coordinator failures
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("No directories given to watch!")]
    NoRoots,

    #[error("failed to start watcher thread for {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher for root {root} failed: {reason}")]
    RootFailed { root: usize, reason: String },

    #[error("watcher for root {root} sent invalid signal {signal:?}")]
    InvalidSignal { root: usize, signal: RootSignal },

    #[error("watcher for root {root} went away without acknowledging")]
    RootLost { root: usize },

    #[error("failed to write record: {0}")]
    Sink(#[source] std::io::Error),
}
