//! Incremental FASTA/FASTQ parsing
//!
//! The parser is fed whatever bytes a growing file has gained since the
//! last read and only hands out records once they can no longer change.
//! Partial records stay buffered until more bytes arrive or the stream is
//! finished.

use crate::record::{RecordFormat, SeqRecord};
use thiserror::Error;

/// Options controlling how records are parsed and validated
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Input record format
    pub format: RecordFormat,
    /// ASCII offset of quality scores (33 for Phred+33)
    pub qual_base: u8,
    /// Accept the gap character `-` in sequences
    pub allow_gaps: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            format: RecordFormat::Fastq,
            qual_base: 33,
            allow_gaps: false,
        }
    }
}

/// A record that could not be parsed; the parser skips it and carries on
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected a line starting with '{expected}', found {line:?}")]
    MissingHeader { expected: char, line: String },

    #[error("record {id}: missing '+' separator line")]
    MissingSeparator { id: String },

    #[error("record {id}: quality length {qual_len} does not match sequence length {seq_len}")]
    QualityLength {
        id: String,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("record {id}: gap character '-' not allowed")]
    GapNotAllowed { id: String },

    #[error("record {id}: quality character below ASCII base {base}")]
    QualityBelowBase { id: String, base: u8 },

    #[error("stream ended inside a record ({bytes} bytes left over)")]
    Truncated { bytes: usize },
}

/// Line span inside the buffer: (begin, end without line terminator, start of next line)
type Line = (usize, usize, usize);

/// Incremental parser for one input stream
pub struct FastxParser {
    opts: ParseOptions,
    buf: Vec<u8>,
    start: usize,
    finished: bool,
}

impl FastxParser {
    /// Create a parser for the given options
    pub fn new(opts: ParseOptions) -> Self {
        Self {
            opts,
            buf: Vec::new(),
            start: 0,
            finished: false,
        }
    }

    /// Append newly read bytes
    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 && self.start >= self.buf.len() / 2 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Mark the end of input; trailing data is parsed as final
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Bytes received but not yet consumed by a record
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Next complete record, or `None` when more input is needed
    pub fn next_record(&mut self) -> Option<Result<SeqRecord, ParseError>> {
        self.skip_blank_lines();
        if self.start >= self.buf.len() {
            return None;
        }

        let next = match self.opts.format {
            RecordFormat::Fasta => self.next_fasta(),
            RecordFormat::Fastq => self.next_fastq(),
        };

        match next {
            None if self.finished && self.start < self.buf.len() => {
                let bytes = self.buf.len() - self.start;
                self.start = self.buf.len();
                Some(Err(ParseError::Truncated { bytes }))
            }
            other => other,
        }
    }

    fn next_fastq(&mut self) -> Option<Result<SeqRecord, ParseError>> {
        let (h0, h1, n1) = self.line(self.start)?;
        if self.buf[h0] != b'@' {
            let err = self.missing_header(h0, h1);
            self.resync();
            return Some(Err(err));
        }
        let (s0, s1, n2) = self.line(n1)?;
        let (p0, p1, n3) = self.line(n2)?;
        let (q0, q1, n4) = self.line(n3)?;

        let id = self.text(h0 + 1, h1);
        if p1 == p0 || self.buf[p0] != b'+' {
            self.start = n1;
            self.resync();
            return Some(Err(ParseError::MissingSeparator { id }));
        }

        let seq = self.buf[s0..s1].to_vec();
        let qual = self.buf[q0..q1].to_vec();
        self.start = n4;

        if seq.len() != qual.len() {
            return Some(Err(ParseError::QualityLength {
                id,
                seq_len: seq.len(),
                qual_len: qual.len(),
            }));
        }
        Some(self.validate(SeqRecord::fastq(id, seq, qual)))
    }

    fn next_fasta(&mut self) -> Option<Result<SeqRecord, ParseError>> {
        let (h0, h1, mut next) = self.line(self.start)?;
        if self.buf[h0] != b'>' {
            let err = self.missing_header(h0, h1);
            self.resync();
            return Some(Err(err));
        }

        let mut seq = Vec::new();
        loop {
            match self.line(next) {
                Some((b, e, n)) => {
                    if e > b && self.buf[b] == b'>' {
                        break;
                    }
                    seq.extend_from_slice(&self.buf[b..e]);
                    next = n;
                }
                // A header that has started arriving already closes the record
                None if next < self.buf.len() && self.buf[next] == b'>' => break,
                None if self.finished => break,
                None => return None,
            }
        }

        let id = self.text(h0 + 1, h1);
        self.start = next;
        Some(self.validate(SeqRecord::fasta(id, seq)))
    }

    fn validate(&self, record: SeqRecord) -> Result<SeqRecord, ParseError> {
        if !self.opts.allow_gaps && record.seq.contains(&b'-') {
            return Err(ParseError::GapNotAllowed { id: record.id });
        }
        if let Some(qual) = &record.qual {
            if qual.iter().any(|&q| q < self.opts.qual_base) {
                return Err(ParseError::QualityBelowBase {
                    id: record.id,
                    base: self.opts.qual_base,
                });
            }
        }
        Ok(record)
    }

    /// Complete line starting at `from`; the unterminated tail counts once finished
    fn line(&self, from: usize) -> Option<Line> {
        if from >= self.buf.len() {
            return None;
        }
        let (mut end, next) = match self.buf[from..].iter().position(|&b| b == b'\n') {
            Some(off) => (from + off, from + off + 1),
            None if self.finished => (self.buf.len(), self.buf.len()),
            None => return None,
        };
        if end > from && self.buf[end - 1] == b'\r' {
            end -= 1;
        }
        Some((from, end, next))
    }

    fn skip_blank_lines(&mut self) {
        while let Some((b, e, next)) = self.line(self.start) {
            if b != e {
                break;
            }
            self.start = next;
        }
    }

    /// Skip complete lines until one starts with the record marker
    fn resync(&mut self) {
        let marker = self.opts.format.marker();
        while let Some((b, e, next)) = self.line(self.start) {
            if e > b && self.buf[b] == marker {
                return;
            }
            self.start = next;
        }
    }

    fn missing_header(&self, begin: usize, end: usize) -> ParseError {
        ParseError::MissingHeader {
            expected: self.opts.format.marker() as char,
            line: self.text(begin, end),
        }
    }

    fn text(&self, begin: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.buf[begin..end]).into_owned()
    }
}
