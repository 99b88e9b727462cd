//! Per-root directory watcher
//!
//! Owns the registry for one watch root and translates change
//! notifications into registry updates and session control signals.
//! Every registry access happens under the registry lock, from this
//! watcher's own loop.

use crate::control::{RootSignal, WatcherLink};
use crate::debounce::{GrowthPolicy, IgnoreReason, WriteDecision};
use crate::diagnostics::{Diagnostics, WatchNote};
use crate::discover::{self, Discovered};
use crate::error::WatchError;
use crate::pattern::NameFilter;
use crate::platform::ChangeSource;
use crate::registry::{EofPolicy, Registry, WatchEntry};
use crate::{EventKind, WatchEvent};
use crossbeam_channel::{select, tick, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use scat_core::SessionFactory;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

/// Lower bound for the periodic refresh sweep
pub const MIN_REFRESH: Duration = Duration::from_millis(50);

/// What a watcher tracks and how eagerly it re-reads
#[derive(Clone, Debug)]
pub struct WatchOptions {
    pub filter: NameFilter,
    pub policy: GrowthPolicy,
    /// Interval of the refresh sweep (see `reconcile`)
    pub refresh_interval: Duration,
}

impl WatchOptions {
    /// Options with the refresh sweep running once per cooldown
    pub fn new(filter: NameFilter, policy: GrowthPolicy) -> Self {
        Self {
            refresh_interval: policy.cooldown.max(MIN_REFRESH),
            filter,
            policy,
        }
    }
}

/// Whether the event loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The watch root itself went away
    RootGone,
}

/// Watches one root and drives the sessions of the files under it
pub struct DirectoryWatcher<F: SessionFactory, S: ChangeSource> {
    index: usize,
    root: PathBuf,
    registry: Mutex<Registry>,
    source: S,
    factory: Arc<F>,
    records: Sender<F::Record>,
    options: WatchOptions,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<F: SessionFactory, S: ChangeSource> DirectoryWatcher<F, S> {
    pub fn new(
        index: usize,
        root: PathBuf,
        source: S,
        factory: Arc<F>,
        records: Sender<F::Record>,
        options: WatchOptions,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            index,
            root: absolute_root(root),
            registry: Mutex::new(Registry::new()),
            source,
            factory,
            records,
            options,
            diagnostics,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lock the registry
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock()
    }

    /// Run until stopped, then send the terminal acknowledgment
    pub fn run(self, link: WatcherLink) {
        let index = self.index;
        let signal = match self.event_loop(&link.down) {
            Ok(()) => RootSignal::Finished { root: index },
            Err(e) => {
                error!(root = index, "Watcher failed: {}", e);
                RootSignal::Failed {
                    root: index,
                    reason: e.to_string(),
                }
            }
        };
        // Release the record sender before acknowledging
        drop(self);
        let _ = link.up.send(signal);
    }

    fn event_loop(&self, control: &Receiver<RootSignal>) -> Result<(), WatchError> {
        self.start()?;
        let refresh = tick(self.options.refresh_interval);

        loop {
            select! {
                recv(control) -> msg => match msg {
                    Ok(RootSignal::Stop { .. }) | Err(_) => return self.shutdown(),
                    Ok(other) => return Err(WatchError::Control(other)),
                },
                recv(self.source.events()) -> event => {
                    let flow = match event {
                        Ok(event) => self.handle_event(event)?,
                        Err(_) => Flow::RootGone,
                    };
                    if flow == Flow::RootGone {
                        return self.shutdown();
                    }
                },
                recv(self.source.errors()) -> err => match err {
                    Ok(e) => return Err(WatchError::Source(e)),
                    Err(_) => return self.shutdown(),
                },
                recv(refresh) -> _ => self.refresh()?,
            }
        }
    }

    /// Register and subscribe the root, then run the discovery walk
    pub fn start(&self) -> Result<(), WatchError> {
        {
            let mut reg = self.registry.lock();
            self.source
                .subscribe(&self.root)
                .map_err(|source| WatchError::Subscribe {
                    path: self.root.clone(),
                    source,
                })?;
            reg.insert_dir(&self.root);
            self.note(WatchNote::RootLaunched {
                path: self.root.clone(),
            });
        }
        self.discover()
    }

    /// Walk the whole root, registering anything not yet tracked
    pub fn discover(&self) -> Result<(), WatchError> {
        for found in discover::walk(&self.root) {
            let mut reg = self.registry.lock();
            match found {
                Discovered::Directory(path) => self.watch_dir(&mut reg, &path)?,
                Discovered::File { path, size } => {
                    if !reg.contains(&path) && self.options.filter.matches(&path) {
                        self.watch_file(&mut reg, &path, size);
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply the event policy to one change notification
    pub fn handle_event(&self, event: WatchEvent) -> Result<Flow, WatchError> {
        match event.kind {
            EventKind::Remove => self.on_removed(&event.path, false),
            EventKind::Rename => self.on_removed(&event.path, true),
            EventKind::Create => self.on_created(&event.path),
            EventKind::Write => self.on_written(&event.path),
        }
    }

    /// Stop every session, drop every entry
    pub fn shutdown(&self) -> Result<(), WatchError> {
        self.note(WatchNote::ShutdownBegun);
        let mut reg = self.registry.lock();
        for path in reg.paths() {
            if reg.remove_dir(&path) {
                let _ = self.source.unsubscribe(&path);
                self.note(WatchNote::DirectoryUnwatched { path });
            } else {
                reg.retire_file(&path, EofPolicy::Tolerant)?;
                self.note(WatchNote::FileUnwatched { path });
            }
        }
        self.note(WatchNote::ShutdownComplete);
        Ok(())
    }

    fn on_removed(&self, path: &Path, renamed: bool) -> Result<Flow, WatchError> {
        if path == self.root {
            self.note(WatchNote::RootGone {
                path: path.to_path_buf(),
            });
            return Ok(Flow::RootGone);
        }

        let mut reg = self.registry.lock();
        match reg.get(path).map(WatchEntry::is_dir) {
            None => {}
            Some(true) => {
                // The backend may already have dropped the watch
                let _ = self.source.unsubscribe(path);
                reg.remove_dir(path);
                self.note(WatchNote::DirectoryRemoved {
                    path: path.to_path_buf(),
                });
            }
            Some(false) => {
                reg.retire_file(path, EofPolicy::Strict)?;
                let path = path.to_path_buf();
                self.note(if renamed {
                    WatchNote::FileRenamed { path }
                } else {
                    WatchNote::FileRemoved { path }
                });
            }
        }
        Ok(Flow::Continue)
    }

    fn on_created(&self, path: &Path) -> Result<Flow, WatchError> {
        {
            let mut reg = self.registry.lock();
            if reg.contains(path) {
                return Ok(Flow::Continue);
            }
            // Gone again before we could look; a remove notification follows
            let Ok(meta) = fs::metadata(path) else {
                return Ok(Flow::Continue);
            };

            if !meta.is_dir() {
                if !self.options.filter.matches(path) {
                    self.note(WatchNote::FileSkipped {
                        path: path.to_path_buf(),
                    });
                } else if meta.is_file() {
                    self.watch_file(&mut reg, path, meta.len());
                }
                return Ok(Flow::Continue);
            }
            self.watch_dir(&mut reg, path)?;
        }

        // Walk again from the root to pick up anything inside the new directory
        self.discover()?;
        Ok(Flow::Continue)
    }

    fn on_written(&self, path: &Path) -> Result<Flow, WatchError> {
        let Ok(meta) = fs::metadata(path) else {
            return Ok(Flow::Continue);
        };
        if meta.is_dir() {
            return Ok(Flow::Continue);
        }

        let mut reg = self.registry.lock();
        if let Some(WriteDecision::Ignore(reason)) =
            self.apply_growth(&mut reg, path, meta.len(), Instant::now())?
        {
            self.note(WatchNote::WriteIgnored {
                path: path.to_path_buf(),
                reason,
            });
        }
        Ok(Flow::Continue)
    }

    /// Run the growth policy for a tracked file and act on the outcome
    ///
    /// Returns `None` for paths that are not tracked files, including a
    /// file whose session turned out to have exited on its own.
    pub(crate) fn apply_growth(
        &self,
        reg: &mut Registry,
        path: &Path,
        size: u64,
        now: Instant,
    ) -> Result<Option<WriteDecision>, WatchError> {
        let Some(state) = reg.file_mut(path) else {
            return Ok(None);
        };
        if state.poll_acks(path)? {
            reg.reap_exited(path);
            self.note(WatchNote::SessionExited {
                path: path.to_path_buf(),
            });
            return Ok(None);
        }

        let decision = self
            .options
            .policy
            .decide(state.last_size, state.last_try, size, now);
        match decision {
            WriteDecision::Ignore(_) => Ok(Some(decision)),
            WriteDecision::Truncated => {
                reg.retire_file(path, EofPolicy::Strict)?;
                self.note(WatchNote::FileTruncated {
                    path: path.to_path_buf(),
                    size,
                });
                Ok(Some(decision))
            }
            WriteDecision::Reread { .. } => {
                if !state.request_try(size, now) {
                    // Left for the refresh sweep once the pending Try is answered
                    return Ok(Some(WriteDecision::Ignore(IgnoreReason::AwaitingEof)));
                }
                self.note(WatchNote::RereadIssued {
                    path: path.to_path_buf(),
                    size,
                });
                Ok(Some(decision))
            }
        }
    }

    fn watch_dir(&self, reg: &mut Registry, path: &Path) -> Result<(), WatchError> {
        if reg.contains(path) {
            return Ok(());
        }
        self.source
            .subscribe(path)
            .map_err(|source| WatchError::Subscribe {
                path: path.to_path_buf(),
                source,
            })?;
        reg.insert_dir(path);
        self.note(WatchNote::DirectoryWatched {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Start a session for a matching file and ask it to read right away
    fn watch_file(&self, reg: &mut Registry, path: &Path, size: u64) {
        let session = match self.factory.open(path, self.records.clone()) {
            Ok(session) => session,
            Err(e) => {
                self.note(WatchNote::SessionOpenFailed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let now = Instant::now();
        // A duplicate hands the session back; dropping it closes that session
        if let Ok(state) = reg.insert_file(path, size, now, session) {
            state.request_try(size, now);
            self.note(WatchNote::FileWatched {
                path: path.to_path_buf(),
                size,
            });
        }
    }

    pub(crate) fn note(&self, note: WatchNote) {
        self.diagnostics.note(self.index, note);
    }
}

/// Resolve a root the way change notifications will spell it
///
/// Backends report absolute paths, so registry keys must be absolute too.
/// A root that does not exist yet is only made absolute.
fn absolute_root(root: PathBuf) -> PathBuf {
    fs::canonicalize(&root)
        .or_else(|_| std::path::absolute(&root))
        .unwrap_or(root)
}
