pub mod csv_sink;
pub mod rows;

pub use csv_sink::CsvSink;
pub use rows::CsvRecord;

use anyhow::Result;

/// Destination for completed records. Append-only.
pub trait RecordSink<R>: Send + 'static {
    fn append(&mut self, record: &R) -> Result<()>;

    /// Flushes and releases the destination at the end of a run.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
