//! Output sink for the merged record stream

use flate2::write::GzEncoder;
use flate2::Compression;
use scat_core::{RecordFormat, SeqRecord};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use watcher::RecordSink;

/// Writes rendered records to stdout or an append-opened file
pub struct FastxSink {
    out: Box<dyn Write + Send>,
    format: RecordFormat,
}

impl FastxSink {
    /// Open `target`: `-` is stdout, a `.gz` suffix compresses
    pub fn open(target: &str, format: RecordFormat) -> io::Result<Self> {
        if target == "-" {
            return Ok(Self::new(Box::new(BufWriter::new(io::stdout())), format));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)?;
        let writer = BufWriter::new(file);
        let out: Box<dyn Write + Send> = if Path::new(target)
            .extension()
            .is_some_and(|ext| ext == "gz")
        {
            Box::new(GzEncoder::new(writer, Compression::default()))
        } else {
            Box::new(writer)
        };
        Ok(Self::new(out, format))
    }

    pub fn new(out: Box<dyn Write + Send>, format: RecordFormat) -> Self {
        Self { out, format }
    }
}

impl RecordSink<SeqRecord> for FastxSink {
    fn write_record(&mut self, record: &SeqRecord) -> io::Result<()> {
        writeln!(self.out, "{}", record.render(self.format))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
