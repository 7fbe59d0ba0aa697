//! Directives registered per operation.

use bizlog_types::{Directive, OperationId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Maps each operation to the ordered directives applied to its calls.
///
/// Loaded at startup; lookups share the stored list without copying.
#[derive(Debug, Default)]
pub struct DirectiveRegistry {
    directives: RwLock<HashMap<OperationId, Arc<[Directive]>>>,
}

impl DirectiveRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directives for `operation`, replacing any earlier set.
    ///
    /// Returns the replaced set.
    pub fn register(
        &self,
        operation: impl Into<OperationId>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Option<Arc<[Directive]>> {
        let operation = operation.into();
        let directives: Arc<[Directive]> = directives.into_iter().collect();
        let count = directives.len();

        let previous = self.directives.write().insert(operation.clone(), directives);
        if previous.is_some() {
            info!(operation = %operation, count, "replaced operation directives");
        } else {
            debug!(operation = %operation, count, "registered operation directives");
        }
        previous
    }

    /// Directives for `operation`, in declaration order.
    pub fn get(&self, operation: &str) -> Option<Arc<[Directive]>> {
        self.directives.read().get(operation).cloned()
    }

    /// Remove the directives for `operation`.
    pub fn remove(&self, operation: &str) -> Option<Arc<[Directive]>> {
        self.directives.write().remove(operation)
    }

    /// Check if `operation` has directives.
    pub fn contains(&self, operation: &str) -> bool {
        self.directives.read().contains_key(operation)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.directives.read().len()
    }

    /// Check if no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.directives.read().is_empty()
    }

    /// Registered operations, sorted.
    pub fn operations(&self) -> Vec<OperationId> {
        let mut ops: Vec<OperationId> = self.directives.read().keys().cloned().collect();
        ops.sort();
        ops
    }
}
