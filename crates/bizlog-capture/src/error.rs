//! Capture errors.

use bizlog_common_thread::PoolError;
use thiserror::Error;

/// Errors raised while building an interceptor.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The dispatcher pool could not be started.
    #[error("failed to start dispatcher: {0}")]
    Dispatcher(#[from] PoolError),
}
