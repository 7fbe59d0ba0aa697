//! Per-invocation variable store exposed to the expression engine.

use crate::FunctionRegistry;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::warn;

/// Named argument values of one operation call, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    bindings: Vec<(String, Value)>,
}

impl Arguments {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a serializable argument. Values that fail to serialize bind as `null`.
    pub fn arg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        let value = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(argument = %name, error = %e, "argument is not serializable, binding null");
                Value::Null
            }
        };
        self.bindings.push((name, value));
        self
    }

    /// Add an argument that is already a JSON value.
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.push((name.into(), value));
        self
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl IntoIterator for Arguments {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_iter()
    }
}

/// Variables and functions visible to expressions during one call.
///
/// A context belongs to exactly one in-flight call. It may be reused for a
/// later call only after [`InvocationContext::clear`], which
/// [`ContextGuard`] guarantees on every exit path.
#[derive(Clone, Default)]
pub struct InvocationContext {
    variables: HashMap<String, Value>,
    functions: Option<Arc<FunctionRegistry>>,
}

impl InvocationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one parameter. Rebinding a name replaces its value.
    pub fn bind_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Bind every argument of a call.
    pub fn bind_arguments(&mut self, args: Arguments) {
        for (name, value) in args {
            self.variables.insert(name, value);
        }
    }

    /// Look up a bound variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Make a function registry reachable from expressions.
    pub fn expose_functions(&mut self, registry: Arc<FunctionRegistry>) {
        self.functions = Some(registry);
    }

    /// The exposed function registry, if any.
    pub fn functions(&self) -> Option<&FunctionRegistry> {
        self.functions.as_deref()
    }

    /// Discard every binding, including exposed functions.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.functions = None;
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.functions.is_none()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Borrow this context for one call, clearing it when the guard drops.
    pub fn scoped(&mut self) -> ContextGuard<'_> {
        ContextGuard { context: self }
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();
        f.debug_struct("InvocationContext")
            .field("variables", &names)
            .field("functions", &self.functions.is_some())
            .finish()
    }
}

/// Clears the borrowed context when dropped, including during unwinding.
pub struct ContextGuard<'a> {
    context: &'a mut InvocationContext,
}

impl Deref for ContextGuard<'_> {
    type Target = InvocationContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: String,
    }

    #[test]
    fn test_arguments_preserve_order() {
        let args = Arguments::new()
            .arg("b", 1)
            .arg("a", "two")
            .value("c", json!([3]));

        let names: Vec<&str> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_arguments_serialize_structs() {
        let args = Arguments::new().arg(
            "user",
            User {
                id: 7,
                name: "ann".to_string(),
            },
        );
        let (_, value) = args.iter().next().unwrap();
        assert_eq!(value, &json!({"id": 7, "name": "ann"}));
    }

    #[test]
    fn test_unserializable_argument_binds_null() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON keys");
        let args = Arguments::new().arg("bad", map);
        assert_eq!(args.iter().next().unwrap().1, &Value::Null);
    }

    #[test]
    fn test_bind_and_get() {
        let mut ctx = InvocationContext::new();
        ctx.bind_arguments(Arguments::new().arg("orderId", 42));
        ctx.bind_parameter("orderId", json!(43));

        assert_eq!(ctx.get("orderId"), Some(&json!(43)));
        assert_eq!(ctx.get("missing"), None);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut ctx = InvocationContext::new();
        ctx.bind_parameter("x", json!(1));
        ctx.expose_functions(Arc::new(FunctionRegistry::new()));

        ctx.clear();
        assert!(ctx.is_empty());
        assert!(ctx.get("x").is_none());
        assert!(ctx.functions().is_none());
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let mut ctx = InvocationContext::new();
        {
            let mut guard = ctx.scoped();
            guard.bind_parameter("secret", json!("s3"));
            assert_eq!(guard.get("secret"), Some(&json!("s3")));
        }
        assert!(ctx.get("secret").is_none());
    }

    #[test]
    fn test_guard_clears_on_panic() {
        let mut ctx = InvocationContext::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = ctx.scoped();
            guard.bind_parameter("secret", json!(1));
            panic!("operation blew up");
        }));
        assert!(result.is_err());
        assert!(ctx.is_empty());
    }
}
