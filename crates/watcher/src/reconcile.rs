//! Periodic refresh sweep
//!
//! Change notifications can be coalesced or lost (queue overflow, writes
//! landing during a cooldown window). The sweep runs on the watcher's
//! refresh tick and revisits every tracked file:
//! - collects pending acknowledgments and reaps sessions that exited on
//!   their own
//! - retires files that can no longer be stat'ed
//! - re-applies the growth policy to a fresh size, which also re-issues a
//!   re-read that was deferred behind an unanswered `Try`

use crate::diagnostics::WatchNote;
use crate::directory::DirectoryWatcher;
use crate::error::WatchError;
use crate::platform::ChangeSource;
use crate::registry::EofPolicy;
use scat_core::SessionFactory;
use std::fs;
use std::time::Instant;

impl<F: SessionFactory, S: ChangeSource> DirectoryWatcher<F, S> {
    /// Sweep every tracked file once
    pub fn refresh(&self) -> Result<(), WatchError> {
        let mut reg = self.registry();
        let now = Instant::now();

        for path in reg.file_paths() {
            match fs::metadata(&path) {
                // Acknowledgments are collected (and exited sessions reaped) here
                Ok(meta) => {
                    self.apply_growth(&mut reg, &path, meta.len(), now)?;
                }
                Err(_) => {
                    reg.retire_file(&path, EofPolicy::Strict)?;
                    self.note(WatchNote::FileRemoved { path });
                }
            }
        }
        Ok(())
    }
}
