use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{CsvRecord, RecordSink};

/// Appends records to a CSV file, writing the header only when the file
/// starts out empty. Each record is flushed as soon as it is written.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let is_empty = file
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len()
            == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }
}

impl<R: CsvRecord> RecordSink<R> for CsvSink {
    fn append(&mut self, record: &R) -> Result<()> {
        self.writer
            .serialize(record.to_row())
            .with_context(|| format!("failed to write record to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }

    fn close(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }
}
