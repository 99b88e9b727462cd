//! Change notification sources
//!
//! A directory watcher only talks to a [`ChangeSource`]: it subscribes
//! paths and consumes normalized [`WatchEvent`]s and errors from two
//! channels. The native backend wraps `notify`; the manual backend lets
//! tests inject events deterministically.

mod manual;
mod native;

pub use manual::{ManualHandle, ManualSource};
pub use native::{translate, NativeSource};

use crate::error::SourceError;
use crate::WatchEvent;
use crossbeam_channel::Receiver;
use std::path::Path;

/// Subscription to file system change notifications
pub trait ChangeSource: Send {
    /// Start receiving events for `path` (non-recursive)
    fn subscribe(&self, path: &Path) -> Result<(), SourceError>;

    /// Stop receiving events for `path`
    fn unsubscribe(&self, path: &Path) -> Result<(), SourceError>;

    /// Normalized change events
    fn events(&self) -> &Receiver<WatchEvent>;

    /// Asynchronous backend failures
    fn errors(&self) -> &Receiver<SourceError>;
}
