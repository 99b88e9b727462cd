//! Coordinator ↔ watcher control channels

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Signal exchanged between the coordinator and one directory watcher
///
/// `Stop` travels down to a watcher; `Finished` is the watcher's terminal
/// acknowledgment, sent either in reply to `Stop` or unprompted when the
/// watcher winds down on its own. `Failed` reports a fatal watcher error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSignal {
    Stop { root: usize },
    Finished { root: usize },
    Failed { root: usize, reason: String },
}

/// Coordinator end of a root's control pair
#[derive(Debug)]
pub struct RootLink {
    pub down: Sender<RootSignal>,
    pub up: Receiver<RootSignal>,
}

/// Watcher end of a root's control pair
#[derive(Debug)]
pub struct WatcherLink {
    pub down: Receiver<RootSignal>,
    pub up: Sender<RootSignal>,
}

/// Create a connected control pair
pub fn link() -> (RootLink, WatcherLink) {
    let (down_tx, down_rx) = unbounded();
    let (up_tx, up_rx) = unbounded();
    (
        RootLink {
            down: down_tx,
            up: up_rx,
        },
        WatcherLink {
            down: down_rx,
            up: up_tx,
        },
    )
}
