//! Custom functions callable from expressions as `#name(args...)`.

use crate::InvocationContext;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Failures raised by a custom function.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionError {
    /// Wrong number of arguments.
    #[error("expected {expected} argument(s), got {found}")]
    Arity {
        /// Arguments the function takes.
        expected: usize,
        /// Arguments it was called with.
        found: usize,
    },

    /// An argument has the wrong shape.
    #[error("argument {index}: {message}")]
    InvalidArgument {
        /// Zero-based argument position.
        index: usize,
        /// What was wrong with it.
        message: String,
    },

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl FunctionError {
    /// Create a generic failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Fail unless exactly `expected` arguments were passed.
    pub fn check_arity(args: &[Value], expected: usize) -> Result<(), Self> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(Self::Arity {
                expected,
                found: args.len(),
            })
        }
    }
}

/// A stateless function over JSON values.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// A set of functions registered together at startup.
pub trait FunctionProvider {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Register this provider's functions.
    fn register(&self, registry: &FunctionRegistry);
}

/// Process-wide table of named functions.
///
/// Populated once at startup; later registrations are safe and the last one
/// for a name wins.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, Function>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated by each provider in order.
    pub fn from_providers(providers: &[&dyn FunctionProvider]) -> Self {
        let registry = Self::new();
        for provider in providers {
            debug!(provider = provider.name(), "registering function provider");
            provider.register(&registry);
        }
        registry
    }

    /// Register a function under `name`.
    pub fn register<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        let name = name.into();
        let previous = self.functions.write().insert(name.clone(), Arc::new(f));
        if previous.is_some() {
            info!(function = %name, "replaced custom function");
        } else {
            info!(function = %name, "registered custom function");
        }
    }

    /// Look up a function by name.
    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.read().get(name).cloned()
    }

    /// Check if a function is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Check if no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Expose every registered function to `context`.
    pub fn bind_into(self: &Arc<Self>, context: &mut InvocationContext) {
        context.expose_functions(Arc::clone(self));
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Greetings;

    impl FunctionProvider for Greetings {
        fn name(&self) -> &'static str {
            "greetings"
        }

        fn register(&self, registry: &FunctionRegistry) {
            registry.register("hello", |args| {
                FunctionError::check_arity(args, 1)?;
                Ok(json!(format!("hello {}", args[0].as_str().unwrap_or("?"))))
            });
        }
    }

    #[test]
    fn test_register_and_call() {
        let registry = FunctionRegistry::new();
        registry.register("double", |args| {
            let n = args
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| FunctionError::failed("need a number"))?;
            Ok(json!(n * 2))
        });

        let f = registry.get("double").unwrap();
        assert_eq!(f(&[json!(21)]).unwrap(), json!(42));
        assert!(registry.contains("double"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = FunctionRegistry::new();
        registry.register("v", |_| Ok(json!(1)));
        registry.register("v", |_| Ok(json!(2)));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("v").unwrap()(&[]).unwrap(), json!(2));
    }

    #[test]
    fn test_from_providers() {
        let registry = FunctionRegistry::from_providers(&[&Greetings]);
        assert_eq!(registry.names(), vec!["hello".to_string()]);

        let hello = registry.get("hello").unwrap();
        assert_eq!(hello(&[json!("bob")]).unwrap(), json!("hello bob"));
        assert_eq!(
            hello(&[]).unwrap_err(),
            FunctionError::Arity {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn test_bind_into_context() {
        let registry = Arc::new(FunctionRegistry::from_providers(&[&Greetings]));
        let mut ctx = InvocationContext::new();
        registry.bind_into(&mut ctx);
        assert!(ctx.functions().unwrap().contains("hello"));
    }

    #[test]
    fn test_concurrent_registration_is_safe() {
        let registry = Arc::new(FunctionRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.register(format!("f{}", i), move |_| Ok(json!(i)));
                    registry.register("shared", move |_| Ok(json!(i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 5);
    }
}
