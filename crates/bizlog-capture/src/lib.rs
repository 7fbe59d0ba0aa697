//! Operation interception and audit record dispatch for bizlog.
//!
//! An [`Interceptor`] wraps business operations. For every operation with
//! registered [`Directive`]s it:
//!
//! - evaluates directive fields against the call's arguments, before and/or
//!   after the operation runs
//! - marks every record failed when the operation returns an error or panics
//! - renders each record's final message
//! - hands records to a [`Sink`] on a bounded worker pool
//!
//! ```no_run
//! use bizlog_capture::{Arguments, Directive, Interceptor};
//!
//! let interceptor = Interceptor::builder()
//!     .directive_set(
//!         "order.create",
//!         vec![Directive::builder("'created order ' + #orderId")
//!             .biz_id("#orderId")
//!             .biz_type("'order'")
//!             .build()],
//!     )
//!     .build()?;
//!
//! let placed: Result<u64, String> = interceptor.invoke(
//!     "order.create",
//!     Arguments::new().arg("orderId", 42),
//!     || Ok(42),
//! );
//! assert_eq!(placed, Ok(42));
//! # Ok::<(), bizlog_capture::CaptureError>(())
//! ```

mod assembler;
mod dispatcher;
mod error;
mod hook;
mod interceptor;
mod registry;
mod sink;

pub use assembler::{render_fields, RecordAssembler};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::CaptureError;
pub use hook::PostProcessor;
pub use interceptor::{Interceptor, InterceptorBuilder, ERROR_VARIABLE, RESULT_VARIABLE};
pub use registry::DirectiveRegistry;
pub use sink::{JsonLinesSink, LogSink, Sink, SinkError, RECORD_TARGET};

// Re-export types for convenience
pub use bizlog_common_config::DispatcherConfig;
pub use bizlog_common_thread::Execution;
pub use bizlog_expr::{
    Arguments, ExpressionEngine, FunctionError, FunctionProvider, FunctionRegistry,
    InvocationContext, Value,
};
pub use bizlog_types::{Directive, OperationId, PrefixStyle, Record, RecordField};
