//! Span and timing helpers.

use std::time::{Duration, Instant};
use tracing::{info_span, Span};

/// Span wrapping one intercepted operation call.
pub fn invocation_span(operation: &str) -> Span {
    info_span!("invocation", op = %operation, records = tracing::field::Empty)
}

/// Span wrapping delivery of one record to a sink.
pub fn delivery_span(sink: &str, record_id: &str) -> Span {
    info_span!("delivery", sink = %sink, record = %record_id)
}

/// Wall-clock timer for an operation.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whole milliseconds elapsed so far, saturating at `i64::MAX`.
    pub fn elapsed_millis(&self) -> i64 {
        i64::try_from(self.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}
