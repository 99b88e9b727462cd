//! `notify`-backed change source

use super::ChangeSource;
use crate::error::SourceError;
use crate::{EventKind, WatchEvent};
use crossbeam_channel::{unbounded, Receiver};
use notify::event::{EventKind as NotifyKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::Path;

/// Change source backed by the platform's recommended `notify` watcher
pub struct NativeSource {
    watcher: Mutex<RecommendedWatcher>,
    events: Receiver<WatchEvent>,
    errors: Receiver<SourceError>,
}

impl NativeSource {
    pub fn new() -> Result<Self, SourceError> {
        let (event_tx, events) = unbounded();
        let (error_tx, errors) = unbounded();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for ev in translate(event) {
                        let _ = event_tx.send(ev);
                    }
                }
                Err(e) => {
                    let _ = error_tx.send(SourceError::Notify(e));
                }
            }
        })?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            events,
            errors,
        })
    }
}

impl ChangeSource for NativeSource {
    fn subscribe(&self, path: &Path) -> Result<(), SourceError> {
        self.watcher.lock().watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unsubscribe(&self, path: &Path) -> Result<(), SourceError> {
        self.watcher.lock().unwatch(path)?;
        Ok(())
    }

    fn events(&self) -> &Receiver<WatchEvent> {
        &self.events
    }

    fn errors(&self) -> &Receiver<SourceError> {
        &self.errors
    }
}

/// Normalize a `notify` event into zero or more watch events
///
/// Rename targets and metadata-only changes are dropped: a renamed file is
/// only tracked again once a create notification reports it.
pub fn translate(event: notify::Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        NotifyKind::Create(_) => EventKind::Create,
        NotifyKind::Modify(ModifyKind::Data(_))
        | NotifyKind::Modify(ModifyKind::Any)
        | NotifyKind::Modify(ModifyKind::Other) => EventKind::Write,
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => return Vec::new(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return event
                .paths
                .into_iter()
                .take(1)
                .map(|p| WatchEvent::new(p, EventKind::Rename))
                .collect();
        }
        NotifyKind::Modify(ModifyKind::Name(_)) => EventKind::Rename,
        NotifyKind::Remove(_) => EventKind::Remove,
        NotifyKind::Modify(ModifyKind::Metadata(_))
        | NotifyKind::Access(_)
        | NotifyKind::Any
        | NotifyKind::Other => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|p| WatchEvent::new(p, kind))
        .collect()
}
