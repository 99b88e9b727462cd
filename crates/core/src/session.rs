//! Streaming session control protocol
//!
//! A watcher drives each session with requests and reads back
//! acknowledgments over a pair of channels:
//!
//! | request | acknowledgment | meaning |
//! |---------|----------------|---------|
//! | `Try`   | `Eof`          | caught up with the current end of file; more tries may follow |
//! | `Quit`  | `Exited`       | file released, session gone; terminal |
//!
//! Both directions share one tag set so that a misbehaving peer can be
//! detected instead of being ruled out by the type system.

use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Control tag exchanged between a watcher and a streaming session
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StreamSignal {
    /// Request: read any growth now
    Try,
    /// Request: terminate and release resources
    Quit,
    /// Acknowledgment: caught up to end of file (non-terminal)
    Eof,
    /// Acknowledgment: terminated (terminal)
    Exited,
}

impl fmt::Display for StreamSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamSignal::Try => "Try",
            StreamSignal::Quit => "Quit",
            StreamSignal::Eof => "Eof",
            StreamSignal::Exited => "Exited",
        };
        f.write_str(name)
    }
}

/// Watcher side of one session's control channels
#[derive(Debug)]
pub struct SessionHandle {
    /// Outbound requests (`Try`, `Quit`)
    pub requests: Sender<StreamSignal>,
    /// Inbound acknowledgments (`Eof`, `Exited`)
    pub acks: Receiver<StreamSignal>,
}

/// Session startup failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start session thread for {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Creates streaming sessions for newly tracked files
///
/// Records produced by the session go to `records`; the session owns
/// its sender clone and drops it when it exits.
pub trait SessionFactory: Send + Sync + 'static {
    /// Record type produced by sessions
    type Record: Send + 'static;

    /// Start a session for `path`
    fn open(
        &self,
        path: &Path,
        records: Sender<Self::Record>,
    ) -> Result<SessionHandle, SessionError>;
}
