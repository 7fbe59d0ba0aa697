//! Expression errors.

use crate::FunctionError;
use thiserror::Error;

/// Compilation and evaluation failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    /// The source text is not a valid expression.
    #[error("syntax error at {position}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// No function is registered under the called name.
    #[error("unknown function: #{name}")]
    UnknownFunction {
        /// Called function name.
        name: String,
    },

    /// A custom function returned an error or panicked.
    #[error("function #{name} failed: {source}")]
    Function {
        /// Called function name.
        name: String,
        /// Failure raised by the function.
        #[source]
        source: FunctionError,
    },

    /// Member or index access on `null`.
    #[error("cannot read '{member}' of null")]
    NullMember {
        /// Member or index that was read.
        member: String,
    },

    /// An operator or access was applied to the wrong kind of value.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl ExprError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}
