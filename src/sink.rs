use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::constants::CSV_HEADER;
use crate::sample::Sample;

/// Append-only destination for accepted samples.
pub trait RecordSink {
    fn append(&mut self, sample: &Sample) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;

    /// Flushes and releases the destination, returning rows written this run.
    fn close(self) -> io::Result<u64>
    where
        Self: Sized;
}

/// `timestamp,value` CSV log. Opened once per run and appended to; never truncated.
pub struct CsvSink {
    writer: BufWriter<File>,
    path: PathBuf,
    created: bool,
    rows: u64,
}

impl CsvSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        // A zero-length file counts as new so it still gets a header
        let created = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if created {
            writeln!(writer, "{CSV_HEADER}")?;
            writer.flush()?;
            info!(path = %path.display(), "created new record file");
        } else {
            info!(path = %path.display(), "appending to existing record file");
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            created,
            rows: 0,
        })
    }

    /// Whether this run wrote the header row.
    pub fn created(&self) -> bool {
        self.created
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, sample: &Sample) -> io::Result<()> {
        // `{:?}` keeps a decimal point on whole numbers: 1.0, not 1
        writeln!(self.writer, "{},{:?}", sample.timestamp_label(), sample.value)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn close(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        debug!(rows = self.rows, path = %self.path.display(), "record file closed");
        Ok(self.rows)
    }
}
