//! Thread-backed streaming session over one growing FASTA/FASTQ file

use crate::parse::{FastxParser, ParseOptions};
use crate::record::SeqRecord;
use crate::session::{SessionError, SessionFactory, SessionHandle, StreamSignal};
use crossbeam_channel::{unbounded, Receiver, SendTimeoutError, Sender, TryRecvError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Bytes read from the file per `read` call
const READ_CHUNK: usize = 64 * 1024;

/// How long a blocked record send waits before looking for a `Quit`
const SEND_POLL: Duration = Duration::from_millis(50);

/// Opens one session thread per tracked file
#[derive(Clone, Debug)]
pub struct FastxSessionFactory {
    opts: ParseOptions,
}

impl FastxSessionFactory {
    pub fn new(opts: ParseOptions) -> Self {
        Self { opts }
    }
}

impl SessionFactory for FastxSessionFactory {
    type Record = SeqRecord;

    fn open(&self, path: &Path, records: Sender<SeqRecord>) -> Result<SessionHandle, SessionError> {
        let file = File::open(path).map_err(|source| SessionError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let (req_tx, req_rx) = unbounded();
        let (ack_tx, ack_rx) = unbounded();
        let session = FastxSession {
            path: path.to_path_buf(),
            file,
            parser: FastxParser::new(self.opts),
            records,
            requests: req_rx,
            acks: ack_tx,
            owed_eofs: 0,
        };

        let name = path
            .file_name()
            .map(|n| format!("session:{}", n.to_string_lossy()))
            .unwrap_or_else(|| "session".to_string());
        std::thread::Builder::new()
            .name(name)
            .spawn(move || session.run())
            .map_err(|source| SessionError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(SessionHandle {
            requests: req_tx,
            acks: ack_rx,
        })
    }
}

/// Outcome of a read pass
enum Flow {
    /// Caught up with end of file
    CaughtUp,
    /// A `Quit` arrived while records were blocked on a full queue
    QuitRequested,
}

/// Per-file session state, owned by its thread
struct FastxSession {
    path: PathBuf,
    file: File,
    parser: FastxParser,
    records: Sender<SeqRecord>,
    requests: Receiver<StreamSignal>,
    acks: Sender<StreamSignal>,
    /// `Try` requests taken off the channel mid-pass, still to be acknowledged
    owed_eofs: usize,
}

impl FastxSession {
    fn run(mut self) {
        while let Ok(signal) = self.requests.recv() {
            match signal {
                StreamSignal::Try => match self.catch_up() {
                    Ok(Flow::CaughtUp) => {
                        let owed = 1 + std::mem::take(&mut self.owed_eofs);
                        for _ in 0..owed {
                            if self.acks.send(StreamSignal::Eof).is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Flow::QuitRequested) => return self.exit(),
                    Err(e) => {
                        warn!(path = %self.path.display(), "read failed, closing session: {}", e);
                        return self.exit();
                    }
                },
                StreamSignal::Quit => {
                    match self.catch_up() {
                        Ok(Flow::CaughtUp) => self.flush_tail(),
                        Ok(Flow::QuitRequested) => {}
                        Err(e) => {
                            warn!(path = %self.path.display(), "final read failed: {}", e);
                        }
                    }
                    return self.exit();
                }
                other => {
                    warn!(path = %self.path.display(), "ignoring unexpected request {}", other);
                }
            }
        }
        debug!(path = %self.path.display(), "control channel closed, session ending");
    }

    /// Read to the current end of file, forwarding every complete record
    fn catch_up(&mut self) -> std::io::Result<Flow> {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = self.file.read(&mut chunk)?;
            if n == 0 {
                return Ok(Flow::CaughtUp);
            }
            self.parser.push(&chunk[..n]);
            if let Flow::QuitRequested = self.forward_ready() {
                return Ok(Flow::QuitRequested);
            }
        }
    }

    /// Parse whatever remains once no more bytes are expected
    fn flush_tail(&mut self) {
        self.parser.finish();
        self.forward_ready();
    }

    fn forward_ready(&mut self) -> Flow {
        while let Some(next) = self.parser.next_record() {
            match next {
                Ok(record) => {
                    if let Flow::QuitRequested = self.deliver(record) {
                        return Flow::QuitRequested;
                    }
                }
                Err(e) => warn!(path = %self.path.display(), "skipping record: {}", e),
            }
        }
        Flow::CaughtUp
    }

    /// Send one record, watching for `Quit` while the queue is full
    fn deliver(&mut self, mut record: SeqRecord) -> Flow {
        loop {
            match self.records.send_timeout(record, SEND_POLL) {
                Ok(()) => return Flow::CaughtUp,
                Err(SendTimeoutError::Disconnected(_)) => {
                    debug!(path = %self.path.display(), "record queue closed, dropping record");
                    return Flow::CaughtUp;
                }
                Err(SendTimeoutError::Timeout(back)) => record = back,
            }
            match self.requests.try_recv() {
                Ok(StreamSignal::Quit) => {
                    debug!(path = %self.path.display(), "quit while output queue full");
                    return Flow::QuitRequested;
                }
                Ok(StreamSignal::Try) => self.owed_eofs += 1,
                Ok(other) => warn!(path = %self.path.display(), "ignoring unexpected request {}", other),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Flow::QuitRequested,
            }
        }
    }

    /// Release the file and send the terminal acknowledgment
    fn exit(self) {
        let FastxSession { path, file, acks, .. } = self;
        drop(file);
        debug!(path = %path.display(), "session exited");
        let _ = acks.send(StreamSignal::Exited);
    }
}
