//! Asynchronous, backpressured record delivery.

use crate::sink::{LogSink, Sink};
use crate::CaptureError;
use bizlog_common_config::DispatcherConfig;
use bizlog_common_log::spans::delivery_span;
use bizlog_common_thread::{catch_panic, BoundedPool, Execution};
use bizlog_types::Record;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records the sink accepted.
    pub delivered: u64,
    /// Records delivered on the submitting thread because the queue was full or closed.
    pub caller_ran: u64,
    /// Records the sink rejected or panicked on.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    caller_ran: AtomicU64,
    failed: AtomicU64,
}

/// Hands each record to the sink on a fixed worker pool.
///
/// When the queue is full the submitting thread delivers the record itself,
/// so no record is ever dropped for lack of capacity.
pub struct Dispatcher {
    pool: BoundedPool,
    sink: Arc<dyn Sink>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Start a dispatcher delivering to `sink`.
    pub fn new(config: DispatcherConfig, sink: Arc<dyn Sink>) -> Result<Self, CaptureError> {
        let pool = BoundedPool::new("bizlog-dispatch", config.pool_size, config.queue_capacity)?;
        debug!(sink = sink.name(), pool_size = config.pool_size, queue_capacity = config.queue_capacity, "dispatcher started");
        Ok(Self {
            pool,
            sink,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Start a dispatcher delivering to [`LogSink`].
    pub fn with_log_sink(config: DispatcherConfig) -> Result<Self, CaptureError> {
        Self::new(config, Arc::new(LogSink))
    }

    /// Submit one record for delivery.
    pub fn submit(&self, record: Record) -> Execution {
        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);

        let execution = self
            .pool
            .execute(move || deliver(sink.as_ref(), record, &counters));
        if execution == Execution::CallerRan {
            self.counters.caller_ran.fetch_add(1, Ordering::Relaxed);
        }
        execution
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            caller_ran: self.counters.caller_ran.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Records waiting for a worker.
    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    /// Name of the configured sink.
    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Deliver everything queued and stop the workers.
    ///
    /// Later submissions are delivered on the submitting thread.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        let stats = self.stats();
        debug!(
            delivered = stats.delivered,
            caller_ran = stats.caller_ran,
            failed = stats.failed,
            "dispatcher stopped"
        );
    }
}

fn deliver(sink: &dyn Sink, record: Record, counters: &Counters) {
    let record_id = record.id;
    let span = delivery_span(sink.name(), &record_id.to_string());
    let _entered = span.enter();

    match catch_panic(AssertUnwindSafe(|| sink.deliver(record))) {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(record_id = %record_id, sink = sink.name(), error = %e, "sink rejected record, dropping it");
        }
        Err(panic) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(record_id = %record_id, sink = sink.name(), panic = %panic, "sink panicked, dropping record");
        }
    }
}
