//! Watch registry: one entry per tracked path under a root
//!
//! A file entry owns the control channels of exactly one streaming
//! session. It leaves the registry only through [`Registry::retire_file`]
//! (or [`Registry::reap_exited`]), so removal is always gated on the
//! session's `Exited` acknowledgment.

use crate::error::WatchError;
use crossbeam_channel::TryRecvError;
use scat_core::{SessionHandle, StreamSignal};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Bookkeeping for a tracked file
#[derive(Debug)]
pub struct FileState {
    /// Size when the last re-read was requested (or when tracking began)
    pub last_size: u64,
    /// Time of the last re-read request
    pub last_try: Instant,
    /// A `Try` was sent and its `Eof` has not been collected
    pub awaiting_eof: bool,
    session: SessionHandle,
}

/// What a registry entry tracks
#[derive(Debug)]
pub enum EntryKind {
    Directory,
    File(FileState),
}

/// A tracked path
#[derive(Debug)]
pub struct WatchEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl WatchEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// How a session handshake should treat `Eof` acknowledgments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// Only an `Eof` answering the pending `Try` is legal
    Strict,
    /// Any `Eof` is accepted (shutdown sweep)
    Tolerant,
}

impl FileState {
    fn new(size: u64, now: Instant, session: SessionHandle) -> Self {
        Self {
            last_size: size,
            last_try: now,
            awaiting_eof: false,
            session,
        }
    }

    /// Ask the session to read up to the current end of file
    ///
    /// At most one request is in flight per session. While the previous
    /// `Try` is unanswered nothing is sent and `false` is returned; size
    /// and timestamp stay put so a later sweep asks again.
    pub fn request_try(&mut self, size: u64, now: Instant) -> bool {
        if self.awaiting_eof {
            return false;
        }
        // A closed request channel means the session already left; its
        // Exited is collected on the next acknowledgment poll.
        if self.session.requests.send(StreamSignal::Try).is_ok() {
            self.awaiting_eof = true;
        }
        self.last_size = size;
        self.last_try = now;
        true
    }

    /// Collect pending acknowledgments without blocking
    ///
    /// Returns `true` once the session has sent `Exited`.
    pub fn poll_acks(&mut self, path: &Path) -> Result<bool, WatchError> {
        loop {
            match self.session.acks.try_recv() {
                Ok(StreamSignal::Eof) => self.accept_eof(path, EofPolicy::Strict)?,
                Ok(StreamSignal::Exited) => return Ok(true),
                Ok(other) => return Err(protocol(path, other, "polling acknowledgments")),
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => {
                    return Err(WatchError::SessionLost {
                        path: path.to_path_buf(),
                    })
                }
            }
        }
    }

    /// Send `Quit` and block until the session acknowledges with `Exited`
    ///
    /// A pending `Try` is answered first; `Quit` never overtakes it.
    fn quit(&mut self, path: &Path, eofs: EofPolicy) -> Result<(), WatchError> {
        while self.awaiting_eof {
            match self.recv_ack(path)? {
                StreamSignal::Eof => self.accept_eof(path, eofs)?,
                StreamSignal::Exited => return Ok(()),
                other => return Err(protocol(path, other, "awaiting Eof before Quit")),
            }
        }

        // The session may have exited on its own already; its Exited is queued.
        let _ = self.session.requests.send(StreamSignal::Quit);
        loop {
            match self.recv_ack(path)? {
                StreamSignal::Exited => return Ok(()),
                StreamSignal::Eof => self.accept_eof(path, eofs)?,
                other => return Err(protocol(path, other, "awaiting Exited")),
            }
        }
    }

    fn recv_ack(&self, path: &Path) -> Result<StreamSignal, WatchError> {
        self.session.acks.recv().map_err(|_| WatchError::SessionLost {
            path: path.to_path_buf(),
        })
    }

    fn accept_eof(&mut self, path: &Path, eofs: EofPolicy) -> Result<(), WatchError> {
        if !self.awaiting_eof && eofs == EofPolicy::Strict {
            return Err(protocol(path, StreamSignal::Eof, "no Try was outstanding"));
        }
        self.awaiting_eof = false;
        Ok(())
    }
}

fn protocol(path: &Path, signal: StreamSignal, context: &'static str) -> WatchError {
    WatchError::Protocol {
        path: path.to_path_buf(),
        signal,
        context,
    }
}

/// Mapping from path to watch entry for one root
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<PathBuf, WatchEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&WatchEntry> {
        self.entries.get(path)
    }

    /// Mutable file state, `None` for directories and unknown paths
    pub fn file_mut(&mut self, path: &Path) -> Option<&mut FileState> {
        match self.entries.get_mut(path) {
            Some(WatchEntry {
                kind: EntryKind::File(state),
                ..
            }) => Some(state),
            _ => None,
        }
    }

    /// All tracked paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Tracked file paths, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .entries
            .values()
            .filter(|e| !e.is_dir())
            .map(|e| e.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Register a directory; `false` if the path is already tracked
    pub fn insert_dir(&mut self, path: &Path) -> bool {
        if self.contains(path) {
            return false;
        }
        self.entries.insert(
            path.to_path_buf(),
            WatchEntry {
                path: path.to_path_buf(),
                kind: EntryKind::Directory,
            },
        );
        true
    }

    /// Register a file with its session
    ///
    /// Hands the session back if the path is already tracked.
    pub fn insert_file(
        &mut self,
        path: &Path,
        size: u64,
        now: Instant,
        session: SessionHandle,
    ) -> Result<&mut FileState, SessionHandle> {
        if self.contains(path) {
            return Err(session);
        }
        let entry = self.entries.entry(path.to_path_buf()).or_insert(WatchEntry {
            path: path.to_path_buf(),
            kind: EntryKind::File(FileState::new(size, now, session)),
        });
        match &mut entry.kind {
            EntryKind::File(state) => Ok(state),
            EntryKind::Directory => unreachable!("entry was inserted as a file"),
        }
    }

    /// Drop a directory entry; files are left alone
    pub fn remove_dir(&mut self, path: &Path) -> bool {
        if self.get(path).map(WatchEntry::is_dir).unwrap_or(false) {
            self.entries.remove(path);
            return true;
        }
        false
    }

    /// Quit a file's session, wait for `Exited`, then drop the entry
    ///
    /// Returns `false` if the path is not a tracked file.
    pub fn retire_file(&mut self, path: &Path, eofs: EofPolicy) -> Result<bool, WatchError> {
        let Some(state) = self.file_mut(path) else {
            return Ok(false);
        };
        state.quit(path, eofs)?;
        self.entries.remove(path);
        Ok(true)
    }

    /// Drop a file entry whose session already acknowledged `Exited`
    pub fn reap_exited(&mut self, path: &Path) {
        self.entries.remove(path);
    }
}
