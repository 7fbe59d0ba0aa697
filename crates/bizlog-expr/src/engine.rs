//! Compiles and evaluates directive expressions.

use crate::{Expr, ExprError, FunctionError, InvocationContext};
use bizlog_common_thread::catch_panic;
use parking_lot::RwLock;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// Evaluates expressions against an [`InvocationContext`].
///
/// Compiled expressions are cached by source text, so each distinct
/// directive field is parsed once per engine.
#[derive(Debug, Default)]
pub struct ExpressionEngine {
    cache: RwLock<HashMap<String, Arc<Expr>>>,
}

impl ExpressionEngine {
    /// Create an engine with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `src`, reusing a cached tree when available.
    pub fn compile(&self, src: &str) -> Result<Arc<Expr>, ExprError> {
        if let Some(expr) = self.cache.read().get(src) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(Expr::parse(src)?);
        self.cache
            .write()
            .insert(src.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Number of cached compiled expressions.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    /// Compile and evaluate, surfacing any failure.
    ///
    /// Returns `Ok(None)` for a blank expression without compiling it.
    pub fn try_evaluate(
        &self,
        src: &str,
        ctx: &InvocationContext,
    ) -> Result<Option<Value>, ExprError> {
        if src.trim().is_empty() {
            return Ok(None);
        }
        let expr = self.compile(src)?;
        eval(&expr, ctx).map(Some)
    }

    /// Evaluate to a raw value. Failures are logged and yield `None`.
    pub fn evaluate_value(&self, src: &str, ctx: &InvocationContext) -> Option<Value> {
        match self.try_evaluate(src, ctx) {
            Ok(value) => value,
            Err(e) => {
                error!(expression = %src, error = %e, "expression evaluation failed");
                None
            }
        }
    }

    /// Evaluate to a string. Blank expressions, `null` results and failures yield `None`.
    pub fn evaluate(&self, src: &str, ctx: &InvocationContext) -> Option<String> {
        self.evaluate_value(src, ctx).and_then(|v| render(&v))
    }

    /// Evaluate a condition: met only when the result renders as `"true"`.
    pub fn evaluate_condition(&self, src: &str, ctx: &InvocationContext) -> bool {
        self.evaluate(src, ctx).as_deref() == Some("true")
    }
}

/// Render a value as field text. `null` renders as `None`.
pub fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn eval(expr: &Expr, ctx: &InvocationContext) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => Ok(ctx.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(target, member) => match eval(target, ctx)? {
            Value::Object(mut map) => Ok(map.remove(member).unwrap_or(Value::Null)),
            Value::Null => Err(ExprError::NullMember {
                member: member.clone(),
            }),
            other => Err(ExprError::TypeMismatch(format!(
                "cannot read '{}' of {}",
                member,
                type_name(&other)
            ))),
        },
        Expr::Index(target, index) => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            match (target, index) {
                (Value::Array(mut items), Value::Number(n)) => {
                    let i = n
                        .as_u64()
                        .ok_or_else(|| ExprError::TypeMismatch(format!("invalid index {}", n)))?;
                    let i = usize::try_from(i)
                        .map_err(|_| ExprError::TypeMismatch(format!("invalid index {}", n)))?;
                    if i < items.len() {
                        Ok(items.swap_remove(i))
                    } else {
                        Ok(Value::Null)
                    }
                }
                (Value::Object(mut map), Value::String(key)) => {
                    Ok(map.remove(&key).unwrap_or(Value::Null))
                }
                (Value::Null, index) => Err(ExprError::NullMember {
                    member: render(&index).unwrap_or_else(|| "null".to_string()),
                }),
                (target, index) => Err(ExprError::TypeMismatch(format!(
                    "cannot index {} with {}",
                    type_name(&target),
                    type_name(&index)
                ))),
            }
        }
        Expr::Call(name, args) => {
            let function = ctx
                .functions()
                .and_then(|registry| registry.get(name))
                .ok_or_else(|| ExprError::UnknownFunction { name: name.clone() })?;
            let values = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = catch_panic(AssertUnwindSafe(|| function(&values)))
                .unwrap_or_else(|panic| Err(FunctionError::failed(format!("panicked: {}", panic))));
            outcome.map_err(|source| ExprError::Function {
                name: name.clone(),
                source,
            })
        }
        Expr::Add(left, right) => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            Ok(add(left, right))
        }
        Expr::Equals {
            left,
            right,
            negated,
        } => {
            let equal = values_equal(&eval(left, ctx)?, &eval(right, ctx)?);
            Ok(Value::Bool(equal != *negated))
        }
        Expr::Not(operand) => match eval(operand, ctx)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(ExprError::TypeMismatch(format!(
                "cannot negate {}",
                type_name(&other)
            ))),
        },
    }
}

/// Numeric addition when both sides are numbers, string concatenation otherwise.
fn add(left: Value, right: Value) -> Value {
    if let (Value::Number(a), Value::Number(b)) = (&left, &right) {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(sum) = x.checked_add(y) {
                return Value::Number(sum.into());
            }
        }
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            if let Some(sum) = Number::from_f64(x + y) {
                return Value::Number(sum);
            }
        }
    }
    let mut text = concat_text(&left);
    text.push_str(&concat_text(&right));
    Value::String(text)
}

fn concat_text(value: &Value) -> String {
    render(value).unwrap_or_else(|| "null".to_string())
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
