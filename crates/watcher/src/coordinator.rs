//! Root coordinator
//!
//! Spawns one directory watcher thread per watch root and merges their
//! record queues into a single stream. The scheduling loop is a
//! cooperative round-robin poll: each iteration checks the interrupt
//! input, the liveness timer and the inactivity deadline, then drains a
//! bounded slice of every active root's queue and looks for that root's
//! terminal acknowledgment. It never blocks indefinitely.
//!
//! Shutdown is a two-phase broadcast: `Stop` goes to every active root,
//! then each acknowledgment is collected in turn while the root's queue
//! keeps draining.

use crate::control::{link, RootLink, RootSignal};
use crate::diagnostics::Diagnostics;
use crate::directory::{DirectoryWatcher, WatchOptions};
use crate::error::CoordinatorError;
use crate::platform::ChangeSource;
use crossbeam_channel::{bounded, never, select, tick, Receiver, TryRecvError};
use scat_core::SessionFactory;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Placeholder root meaning "nothing to watch here"
pub const NO_WATCH: &str = "-";

/// Capacity of each root's record queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Interval between process liveness probes
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(2);

/// Pause after a round that did no work
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Drop the no-watch placeholder from a list of roots
pub fn usable_roots<I, P>(roots: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    roots
        .into_iter()
        .map(Into::into)
        .filter(|p| p.as_os_str() != NO_WATCH)
        .collect()
}

/// Reports whether the external process gating shutdown still runs
pub trait ProcessProbe: Send {
    fn is_alive(&self) -> bool;
}

/// Destination of the merged record stream
pub trait RecordSink<R> {
    fn write_record(&mut self, record: &R) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Coordinator tuning
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub queue_capacity: usize,
    pub liveness_interval: Duration,
    /// Stop after this long without a forwarded record
    pub time_limit: Option<Duration>,
    pub idle_backoff: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            time_limit: None,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    ProcessExited,
    Inactive,
    AllFinished,
}

/// Outcome of [`Coordinator::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Records forwarded to the sink
    pub records: u64,
    pub stop: StopReason,
    /// Roots that were sent `Stop` by the final broadcast
    pub stopped: Vec<usize>,
}

/// What woke a root's acknowledgment wait
enum Wake<R> {
    Record(R),
    RecordsClosed,
    Ack(Option<RootSignal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootState {
    Active,
    Retired,
}

struct Root<R> {
    path: PathBuf,
    link: RootLink,
    records: Receiver<R>,
    state: RootState,
    thread: Option<JoinHandle<()>>,
}

/// Owns the directory watchers of one run
pub struct Coordinator<R> {
    roots: Vec<Root<R>>,
    options: CoordinatorOptions,
    probe: Option<Box<dyn ProcessProbe>>,
    interrupts: Option<Receiver<()>>,
    forwarded: u64,
}

impl<R: Send + 'static> Coordinator<R> {
    /// Spawn one watcher thread per root
    pub fn launch<F, S>(
        roots: Vec<(PathBuf, S)>,
        factory: Arc<F>,
        watch: WatchOptions,
        diagnostics: Arc<dyn Diagnostics>,
        options: CoordinatorOptions,
    ) -> Result<Self, CoordinatorError>
    where
        F: SessionFactory<Record = R>,
        S: ChangeSource + 'static,
    {
        if roots.is_empty() {
            return Err(CoordinatorError::NoRoots);
        }

        let mut launched = Vec::with_capacity(roots.len());
        for (index, (path, source)) in roots.into_iter().enumerate() {
            let (records_tx, records) = bounded(options.queue_capacity);
            let (root_link, watcher_link) = link();
            let watcher = DirectoryWatcher::new(
                index,
                path.clone(),
                source,
                factory.clone(),
                records_tx,
                watch.clone(),
                diagnostics.clone(),
            );

            // Watchers already started see their control link drop on error
            let thread = thread::Builder::new()
                .name(format!("watch:{index}"))
                .spawn(move || watcher.run(watcher_link))
                .map_err(|source| CoordinatorError::Spawn {
                    path: path.clone(),
                    source,
                })?;

            launched.push(Root {
                path,
                link: root_link,
                records,
                state: RootState::Active,
                thread: Some(thread),
            });
        }

        Ok(Self {
            roots: launched,
            options,
            probe: None,
            interrupts: None,
            forwarded: 0,
        })
    }

    /// Stop once the probed process is gone
    pub fn with_probe(mut self, probe: Box<dyn ProcessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Stop on the first value received here
    pub fn with_interrupts(mut self, interrupts: Receiver<()>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    /// Indices of roots that have not retired
    pub fn active_roots(&self) -> Vec<usize> {
        self.roots
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state == RootState::Active)
            .map(|(i, _)| i)
            .collect()
    }

    /// Forward records until a shutdown trigger fires
    pub fn run<K: RecordSink<R>>(&mut self, sink: &mut K) -> Result<RunSummary, CoordinatorError> {
        let liveness = self
            .probe
            .as_ref()
            .map(|_| tick(self.options.liveness_interval));
        let mut last_activity = Instant::now();

        loop {
            if self.interrupted() {
                info!("Interrupt received, stopping watchers");
                return self.stop(sink, StopReason::Interrupted);
            }

            let probe_due = liveness.as_ref().is_some_and(|t| t.try_recv().is_ok());
            if probe_due && self.probe.as_ref().is_some_and(|p| !p.is_alive()) {
                info!("Watched process exited, stopping watchers");
                return self.stop(sink, StopReason::ProcessExited);
            }

            if let Some(limit) = self.options.time_limit {
                if last_activity.elapsed() >= limit {
                    info!(?limit, "No records within time limit, stopping watchers");
                    return self.stop(sink, StopReason::Inactive);
                }
            }

            let mut busy = false;
            for index in 0..self.roots.len() {
                if self.roots[index].state == RootState::Retired {
                    continue;
                }
                if self.drain(index, sink)? > 0 {
                    busy = true;
                    last_activity = Instant::now();
                }
                if self.poll_finished(index)? {
                    busy = true;
                    self.drain(index, sink)?;
                }
            }

            if busy {
                sink.flush().map_err(CoordinatorError::Sink)?;
            }
            if self.roots.iter().all(|r| r.state == RootState::Retired) {
                info!("All watchers finished");
                self.join();
                return Ok(self.summary(StopReason::AllFinished, Vec::new()));
            }
            if !busy {
                thread::sleep(self.options.idle_backoff);
            }
        }
    }

    /// Check the interrupt input once; stop listening after the first value
    fn interrupted(&mut self) -> bool {
        let Some(rx) = &self.interrupts else {
            return false;
        };
        match rx.try_recv() {
            Ok(()) => {
                self.interrupts = None;
                true
            }
            Err(TryRecvError::Disconnected) => {
                self.interrupts = None;
                false
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Forward a bounded slice of one root's queue
    fn drain<K: RecordSink<R>>(&mut self, index: usize, sink: &mut K) -> Result<usize, CoordinatorError> {
        let mut count = 0;
        for record in self.roots[index]
            .records
            .try_iter()
            .take(self.options.queue_capacity)
        {
            sink.write_record(&record).map_err(CoordinatorError::Sink)?;
            count += 1;
        }
        self.forwarded += count as u64;
        Ok(count)
    }

    /// Look for an unprompted terminal acknowledgment
    fn poll_finished(&mut self, index: usize) -> Result<bool, CoordinatorError> {
        match self.roots[index].link.up.try_recv() {
            Ok(signal) => {
                self.accept_ack(index, signal)?;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(CoordinatorError::RootLost { root: index }),
        }
    }

    fn accept_ack(&mut self, index: usize, signal: RootSignal) -> Result<(), CoordinatorError> {
        match signal {
            RootSignal::Finished { .. } => {
                let root = &mut self.roots[index];
                root.state = RootState::Retired;
                debug!(root = index, "Watcher finished: {}", root.path.display());
                Ok(())
            }
            RootSignal::Failed { reason, .. } => Err(CoordinatorError::RootFailed {
                root: index,
                reason,
            }),
            other => Err(CoordinatorError::InvalidSignal {
                root: index,
                signal: other,
            }),
        }
    }

    /// Two-phase broadcast: `Stop` to every active root, then collect acks
    fn stop<K: RecordSink<R>>(
        &mut self,
        sink: &mut K,
        reason: StopReason,
    ) -> Result<RunSummary, CoordinatorError> {
        let stopped = self.active_roots();
        for &index in &stopped {
            // A watcher that already left shows up as lost in phase two
            let _ = self.roots[index].link.down.send(RootSignal::Stop { root: index });
        }
        for &index in &stopped {
            self.await_ack(index, sink)?;
        }

        sink.flush().map_err(CoordinatorError::Sink)?;
        self.join();
        Ok(self.summary(reason, stopped))
    }

    /// Block for one root's acknowledgment, forwarding records meanwhile
    fn await_ack<K: RecordSink<R>>(&mut self, index: usize, sink: &mut K) -> Result<(), CoordinatorError> {
        let closed = never();
        let mut records_open = true;

        loop {
            let wake = {
                let root = &self.roots[index];
                let records = if records_open { &root.records } else { &closed };
                select! {
                    recv(records) -> record => match record {
                        Ok(record) => Wake::Record(record),
                        Err(_) => Wake::RecordsClosed,
                    },
                    recv(root.link.up) -> signal => Wake::Ack(signal.ok()),
                }
            };

            match wake {
                Wake::Record(record) => {
                    sink.write_record(&record).map_err(CoordinatorError::Sink)?;
                    self.forwarded += 1;
                }
                Wake::RecordsClosed => records_open = false,
                Wake::Ack(None) => return Err(CoordinatorError::RootLost { root: index }),
                Wake::Ack(Some(signal)) => {
                    self.accept_ack(index, signal)?;
                    self.drain(index, sink)?;
                    return Ok(());
                }
            }
        }
    }

    fn join(&mut self) {
        for root in &mut self.roots {
            if root.state == RootState::Retired {
                if let Some(thread) = root.thread.take() {
                    let _ = thread.join();
                }
            }
        }
    }

    fn summary(&self, stop: StopReason, stopped: Vec<usize>) -> RunSummary {
        RunSummary {
            records: self.forwarded,
            stop,
            stopped,
        }
    }
}
