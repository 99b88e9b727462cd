//! Deterministic change source driven by the caller

use super::ChangeSource;
use crate::error::SourceError;
use crate::{EventKind, WatchEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Change source fed through a [`ManualHandle`]
pub struct ManualSource {
    events: Receiver<WatchEvent>,
    errors: Receiver<SourceError>,
    subscribed: Arc<Mutex<BTreeSet<PathBuf>>>,
}

/// Producer side of a [`ManualSource`]
///
/// Dropping every handle closes the event stream.
#[derive(Clone)]
pub struct ManualHandle {
    events: Sender<WatchEvent>,
    errors: Sender<SourceError>,
    subscribed: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl ManualSource {
    pub fn new() -> (Self, ManualHandle) {
        let (event_tx, events) = unbounded();
        let (error_tx, errors) = unbounded();
        let subscribed = Arc::new(Mutex::new(BTreeSet::new()));
        (
            Self {
                events,
                errors,
                subscribed: subscribed.clone(),
            },
            ManualHandle {
                events: event_tx,
                errors: error_tx,
                subscribed,
            },
        )
    }
}

impl ManualHandle {
    /// Deliver a change event
    pub fn push(&self, path: impl Into<PathBuf>, kind: EventKind) {
        let _ = self.events.send(WatchEvent::new(path, kind));
    }

    /// Deliver a backend failure
    pub fn fail(&self, message: &str) {
        let _ = self.errors.send(SourceError::Other(message.to_string()));
    }

    pub fn is_subscribed(&self, path: &Path) -> bool {
        self.subscribed.lock().contains(path)
    }

    pub fn subscriptions(&self) -> Vec<PathBuf> {
        self.subscribed.lock().iter().cloned().collect()
    }
}

impl ChangeSource for ManualSource {
    fn subscribe(&self, path: &Path) -> Result<(), SourceError> {
        self.subscribed.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn unsubscribe(&self, path: &Path) -> Result<(), SourceError> {
        self.subscribed.lock().remove(path);
        Ok(())
    }

    fn events(&self) -> &Receiver<WatchEvent> {
        &self.events
    }

    fn errors(&self) -> &Receiver<SourceError> {
        &self.errors
    }
}
