//! Sequence record model and output rendering

use std::fmt;
use std::str::FromStr;

/// Record format accepted on input and produced on output
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordFormat {
    Fasta,
    Fastq,
}

impl RecordFormat {
    /// Marker byte that starts a record header
    pub fn marker(self) -> u8 {
        match self {
            RecordFormat::Fasta => b'>',
            RecordFormat::Fastq => b'@',
        }
    }
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" => Ok(RecordFormat::Fasta),
            "fastq" | "fq" => Ok(RecordFormat::Fastq),
            other => Err(format!("unknown record format '{}' (expected fasta or fastq)", other)),
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordFormat::Fasta => write!(f, "fasta"),
            RecordFormat::Fastq => write!(f, "fastq"),
        }
    }
}

/// A single parsed sequence record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeqRecord {
    /// Full header line without its marker
    pub id: String,
    /// Sequence bytes, line breaks removed
    pub seq: Vec<u8>,
    /// Quality bytes (FASTQ input only)
    pub qual: Option<Vec<u8>>,
}

impl SeqRecord {
    /// Create a record without qualities
    pub fn fasta(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
            qual: None,
        }
    }

    /// Create a record with qualities
    pub fn fastq(id: impl Into<String>, seq: impl Into<Vec<u8>>, qual: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
            qual: Some(qual.into()),
        }
    }

    /// Render the record in the requested output format
    ///
    /// The result has no trailing newline. Rendering a record without
    /// qualities as FASTQ falls back to FASTA; configurations that would
    /// need this are rejected before any session starts.
    pub fn render(&self, format: RecordFormat) -> String {
        let seq = String::from_utf8_lossy(&self.seq);
        match (format, &self.qual) {
            (RecordFormat::Fastq, Some(qual)) => {
                format!("@{}\n{}\n+\n{}", self.id, seq, String::from_utf8_lossy(qual))
            }
            _ => format!(">{}\n{}", self.id, seq),
        }
    }
}
