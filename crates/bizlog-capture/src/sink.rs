//! Record sinks.
//!
//! A [`Sink`] is the output side of the pipeline: it receives each finalized
//! record exactly once, on a dispatcher worker or (when the queue is full)
//! on the thread that submitted it.

use bizlog_types::Record;
use parking_lot::Mutex;
use std::io::Write;
use thiserror::Error;
use tracing::info;

/// Target used by [`LogSink`] for record lines.
pub const RECORD_TARGET: &str = "bizlog::record";

/// Delivery failures reported by a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination cannot be reached.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The record could not be serialized.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing the record failed.
    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    /// The destination refused the record.
    #[error("{0}")]
    Rejected(String),
}

/// Destination for finalized records.
///
/// # Implementation Requirements
///
/// - Sinks are shared across worker threads and must be `Send + Sync`.
/// - An `Err` drops the record; the dispatcher logs it and never retries.
/// - A panic is caught by the dispatcher and treated like an `Err`.
pub trait Sink: Send + Sync {
    /// Deliver one record.
    fn deliver(&self, record: Record) -> Result<(), SinkError>;

    /// Short name used in logs, e.g. "log" or "kafka".
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Writes each record's final message to the log stream at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn deliver(&self, record: Record) -> Result<(), SinkError> {
        info!(
            target: RECORD_TARGET,
            record_id = %record.id,
            success = record.success,
            "{}",
            record.final_message()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Writes each record as one line of camelCase JSON.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn deliver(&self, record: Record) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json-lines"
    }
}
