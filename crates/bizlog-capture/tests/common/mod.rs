#![allow(dead_code)]

use bizlog_capture::{
    Directive, DispatcherConfig, Interceptor, InterceptorBuilder, Record, Sink, SinkError,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::ThreadId;

/// A record as it reached the sink.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub record: Record,
    pub thread: ThreadId,
}

/// Keeps every delivered record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Delivered>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.delivered.lock().iter().map(|d| d.record.clone()).collect()
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }
}

impl Sink for MemorySink {
    fn deliver(&self, record: Record) -> Result<(), SinkError> {
        self.delivered.lock().push(Delivered {
            record,
            thread: std::thread::current().id(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Builder with a single-worker dispatcher, so delivery order equals submission order.
pub fn builder(sink: &MemorySink) -> InterceptorBuilder {
    Interceptor::builder()
        .sink(sink.clone())
        .dispatcher(DispatcherConfig::new(1, 256))
}

/// Interceptor with `directives` registered for `op`.
pub fn interceptor(op: &str, directives: Vec<Directive>) -> (Arc<Interceptor>, MemorySink) {
    let sink = MemorySink::new();
    let interceptor = builder(&sink)
        .directive_set(op, directives)
        .build()
        .expect("interceptor builds");
    (Arc::new(interceptor), sink)
}
