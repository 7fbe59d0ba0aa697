//! Expression engine and invocation context for bizlog directives.
//!
//! Directive fields are small expressions evaluated against the
//! [`InvocationContext`] of one intercepted call:
//!
//! - `#name` reads a bound parameter, `#name.field` and `#name[0]` reach into it
//! - `'text'`, `"text"`, `true`, `false`, `null` and numbers are literals
//! - `#fn(a, b)` calls a function from the [`FunctionRegistry`]
//! - `+` concatenates, `==` / `!=` / `!` compare and negate
//!
//! ```
//! use bizlog_expr::{Arguments, ExpressionEngine, InvocationContext};
//!
//! let engine = ExpressionEngine::new();
//! let mut ctx = InvocationContext::new();
//! ctx.bind_arguments(Arguments::new().arg("orderId", 42));
//!
//! assert_eq!(engine.evaluate("'order ' + #orderId", &ctx).as_deref(), Some("order 42"));
//! ```

mod context;
mod engine;
mod error;
mod function;
mod lexer;
mod parser;

pub use context::{Arguments, ContextGuard, InvocationContext};
pub use engine::{render, ExpressionEngine};
pub use error::ExprError;
pub use function::{Function, FunctionError, FunctionProvider, FunctionRegistry};
pub use parser::Expr;

pub use serde_json::Value;
