//! Sequence records and per-file streaming sessions for seqwatch
//!
//! This crate provides:
//! - FASTA/FASTQ record model and output rendering
//! - Incremental parser fed by arbitrary byte chunks
//! - The streaming session control protocol (`Try`/`Quit` → `Eof`/`Exited`)
//! - A thread-backed session that tails one growing file

pub mod parse;
pub mod record;
pub mod session;
pub mod stream;

// Re-exports
pub use parse::{FastxParser, ParseError, ParseOptions};
pub use record::{RecordFormat, SeqRecord};
pub use session::{SessionError, SessionFactory, SessionHandle, StreamSignal};
pub use stream::FastxSessionFactory;
