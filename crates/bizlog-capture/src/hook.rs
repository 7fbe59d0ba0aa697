//! Post-processing hook run on each finalized record before dispatch.

use bizlog_types::Record;

/// Inspects or enriches a record after its final message is set.
///
/// Errors and panics are logged by the interceptor; the record is still
/// dispatched and other records of the same call are unaffected.
pub trait PostProcessor: Send + Sync {
    /// Called once per record, in declaration order.
    fn after_record(&self, record: &mut Record) -> anyhow::Result<()>;
}

impl<F> PostProcessor for F
where
    F: Fn(&mut Record) -> anyhow::Result<()> + Send + Sync,
{
    fn after_record(&self, record: &mut Record) -> anyhow::Result<()> {
        self(record)
    }
}
