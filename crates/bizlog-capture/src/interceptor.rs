//! Wraps operations and drives the per-call record lifecycle.
//!
//! Each call with registered directives moves through
//! `PreEval → Invoking → PostEval → Finalize → Dispatched → Cleared`.
//! A failed or panicking operation skips `PostEval`; every other phase runs
//! on every path.

use crate::assembler::RecordAssembler;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::hook::PostProcessor;
use crate::registry::DirectiveRegistry;
use crate::sink::{LogSink, Sink};
use crate::CaptureError;
use bizlog_common_config::{BizlogConfig, DispatcherConfig};
use bizlog_common_log::spans::{invocation_span, Timer};
use bizlog_common_thread::{catch_panic, panic_message};
use bizlog_expr::{Arguments, ExpressionEngine, FunctionRegistry, InvocationContext};
use bizlog_types::{Directive, OperationId, Record};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn, Instrument};

/// Variable bound to the operation's return value after a normal return.
pub const RESULT_VARIABLE: &str = "_result";

/// Variable bound to the error text after a failure or panic.
pub const ERROR_VARIABLE: &str = "_errorMessage";

type Panic = Box<dyn Any + Send + 'static>;

/// What the wrapped operation did.
type Outcome<T, E> = Result<Result<T, E>, Panic>;

#[derive(Debug, Clone, Copy)]
enum Phase {
    PreEval,
    Invoking,
    PostEval,
    Finalize,
    Dispatched,
    Cleared,
}

/// Intercepts operation calls and records them according to their directives.
pub struct Interceptor {
    directives: Arc<DirectiveRegistry>,
    functions: Arc<FunctionRegistry>,
    assembler: RecordAssembler,
    dispatcher: Dispatcher,
    post_processor: Option<Arc<dyn PostProcessor>>,
}

impl Interceptor {
    /// Start building an interceptor.
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// The directive registry consulted on every call.
    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// The functions exposed to every call's expressions.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Delivery counters of the dispatcher.
    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Deliver every queued record and stop the dispatcher workers.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    /// Run `f` as `operation` with a fresh context.
    ///
    /// Returns exactly what `f` returns. A panic in `f` is resumed after its
    /// records are dispatched.
    pub fn invoke<T, E, F>(&self, operation: &str, args: Arguments, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize,
        E: Display,
    {
        let mut ctx = InvocationContext::new();
        self.invoke_with(&mut ctx, operation, args, f)
    }

    /// Run `f` as `operation`, borrowing a reusable context.
    ///
    /// The context is cleared before this returns, on every path.
    pub fn invoke_with<T, E, F>(
        &self,
        ctx: &mut InvocationContext,
        operation: &str,
        args: Arguments,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize,
        E: Display,
    {
        let Some(directives) = self.lookup(operation) else {
            return f();
        };

        let span = invocation_span(operation);
        let _entered = span.enter();

        let outcome = {
            let mut guard = ctx.scoped();
            let mut call = Call::begin(self, operation, directives, &mut guard, args);

            trace_phase(operation, Phase::Invoking);
            let timer = Timer::start();
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            let elapsed = timer.elapsed_millis();

            let dispatched = call.complete(&mut guard, &outcome, elapsed);
            span.record("records", dispatched);
            outcome
        };
        trace_phase(operation, Phase::Cleared);

        resume(outcome)
    }

    /// Await `future` as `operation` with a context owned by the returned future.
    pub async fn invoke_async<T, E, Fut>(
        &self,
        operation: &str,
        args: Arguments,
        future: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let Some(directives) = self.lookup(operation) else {
            return future.await;
        };

        let span = invocation_span(operation);
        let record_span = span.clone();

        let outcome = async move {
            let mut ctx = InvocationContext::new();
            let mut guard = ctx.scoped();
            let mut call = Call::begin(self, operation, directives, &mut guard, args);

            trace_phase(operation, Phase::Invoking);
            let timer = Timer::start();
            let outcome = AssertUnwindSafe(future).catch_unwind().await;
            let elapsed = timer.elapsed_millis();

            let dispatched = call.complete(&mut guard, &outcome, elapsed);
            record_span.record("records", dispatched);
            outcome
        }
        .instrument(span)
        .await;
        trace_phase(operation, Phase::Cleared);

        resume(outcome)
    }

    fn lookup(&self, operation: &str) -> Option<Arc<[Directive]>> {
        self.directives.get(operation).filter(|d| !d.is_empty())
    }

    fn post_process(&self, record: &mut Record) {
        let Some(hook) = &self.post_processor else {
            return;
        };
        let record_id = record.id;
        match catch_panic(AssertUnwindSafe(|| hook.after_record(record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(record_id = %record_id, error = %format!("{:#}", e), "post-processor failed")
            }
            Err(panic) => error!(record_id = %record_id, panic = %panic, "post-processor panicked"),
        }
    }
}

/// Records of one in-flight call, keyed by directive declaration index.
struct Call<'a> {
    interceptor: &'a Interceptor,
    operation: &'a str,
    directives: Arc<[Directive]>,
    records: BTreeMap<usize, Record>,
}

impl<'a> Call<'a> {
    fn begin(
        interceptor: &'a Interceptor,
        operation: &'a str,
        directives: Arc<[Directive]>,
        ctx: &mut InvocationContext,
        args: Arguments,
    ) -> Self {
        interceptor.functions.bind_into(ctx);
        ctx.bind_arguments(args);

        let mut call = Self {
            interceptor,
            operation,
            directives,
            records: BTreeMap::new(),
        };
        trace_phase(operation, Phase::PreEval);
        call.evaluate(ctx, true);
        call
    }

    /// Bind the outcome, then run the remaining phases. Returns the number of
    /// records dispatched.
    fn complete<T: Serialize, E: Display>(
        &mut self,
        ctx: &mut InvocationContext,
        outcome: &Outcome<T, E>,
        elapsed_millis: i64,
    ) -> usize {
        match outcome {
            Ok(Ok(value)) => {
                ctx.bind_parameter(RESULT_VARIABLE, to_value(value));
                trace_phase(self.operation, Phase::PostEval);
                self.evaluate(ctx, false);
            }
            Ok(Err(e)) => self.fail(ctx, e.to_string()),
            Err(payload) => self.fail(ctx, panic_message(&**payload)),
        }

        trace_phase(self.operation, Phase::Finalize);
        self.finalize(ctx, elapsed_millis);

        trace_phase(self.operation, Phase::Dispatched);
        self.dispatch()
    }

    fn evaluate(&mut self, ctx: &InvocationContext, before: bool) {
        for (index, directive) in self.directives.iter().enumerate() {
            if directive.evaluate_before_invocation != before {
                continue;
            }
            if let Some(record) = self.interceptor.assembler.create_record(directive, ctx) {
                self.records.insert(index, record);
            }
        }
    }

    fn fail(&mut self, ctx: &mut InvocationContext, message: String) {
        for record in self.records.values_mut() {
            record.fail(message.clone());
        }
        ctx.bind_parameter(ERROR_VARIABLE, Value::String(message));
    }

    fn finalize(&mut self, ctx: &InvocationContext, elapsed_millis: i64) {
        for (index, record) in self.records.iter_mut() {
            record.execution_time_millis = elapsed_millis;
            self.interceptor
                .assembler
                .finalize_message(&self.directives[*index], record, ctx);
            self.interceptor.post_process(record);
        }
    }

    fn dispatch(&mut self) -> usize {
        let records = std::mem::take(&mut self.records);
        let count = records.len();
        for record in records.into_values() {
            self.interceptor.dispatcher.submit(record);
        }
        count
    }
}

fn trace_phase(operation: &str, phase: Phase) {
    debug!(operation, phase = ?phase, "invocation phase");
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "return value is not serializable, binding null");
        Value::Null
    })
}

fn resume<T, E>(outcome: Outcome<T, E>) -> Result<T, E> {
    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Builder for [`Interceptor`].
#[derive(Default)]
pub struct InterceptorBuilder {
    directives: Option<Arc<DirectiveRegistry>>,
    pending: Vec<(OperationId, Vec<Directive>)>,
    functions: Option<Arc<FunctionRegistry>>,
    engine: Option<Arc<ExpressionEngine>>,
    sink: Option<Arc<dyn Sink>>,
    post_processor: Option<Arc<dyn PostProcessor>>,
    dispatcher: DispatcherConfig,
}

impl InterceptorBuilder {
    /// Use a shared directive registry.
    pub fn directives(mut self, registry: Arc<DirectiveRegistry>) -> Self {
        self.directives = Some(registry);
        self
    }

    /// Register directives for one operation.
    pub fn directive_set(
        mut self,
        operation: impl Into<OperationId>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Self {
        self.pending
            .push((operation.into(), directives.into_iter().collect()));
        self
    }

    /// Expose a function registry to every call.
    pub fn functions(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.functions = Some(registry);
        self
    }

    /// Share an expression engine (and its compile cache).
    pub fn engine(mut self, engine: Arc<ExpressionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Deliver records to `sink` instead of the log.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Deliver records to a shared sink.
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run `hook` on each finalized record before dispatch.
    pub fn post_processor(mut self, hook: impl PostProcessor + 'static) -> Self {
        self.post_processor = Some(Arc::new(hook));
        self
    }

    /// Size the dispatcher.
    pub fn dispatcher(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    /// Apply a loaded configuration.
    pub fn config(self, config: &BizlogConfig) -> Self {
        self.dispatcher(config.dispatcher)
    }

    /// Start the dispatcher and build the interceptor.
    pub fn build(self) -> Result<Interceptor, CaptureError> {
        let directives = self.directives.unwrap_or_default();
        for (operation, set) in self.pending {
            directives.register(operation, set);
        }

        let sink = self.sink.unwrap_or_else(|| Arc::new(LogSink));
        let dispatcher = Dispatcher::new(self.dispatcher, sink)?;

        Ok(Interceptor {
            directives,
            functions: self.functions.unwrap_or_default(),
            assembler: RecordAssembler::new(self.engine.unwrap_or_default()),
            dispatcher,
            post_processor: self.post_processor,
        })
    }
}
