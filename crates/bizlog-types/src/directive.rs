//! Audit directives attached to an operation.

use crate::PrefixStyle;
use serde::{Deserialize, Serialize};

/// Describes what to record for one intercepted operation and how.
///
/// Every string field except the prefix style is an expression evaluated
/// against the invocation context. An empty expression means the field is not
/// requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Message expression used when the operation succeeded.
    pub success_template: String,
    /// Message expression used when the operation failed.
    #[serde(default)]
    pub fail_template: String,
    /// Business object identifier.
    #[serde(default)]
    pub biz_id: String,
    /// Business object category.
    #[serde(default)]
    pub biz_type: String,
    /// Who performed the operation.
    #[serde(default)]
    pub operator_id: String,
    /// Free-form additional information.
    #[serde(default)]
    pub extra: String,
    /// Record only when this evaluates to the string `"true"`.
    #[serde(default)]
    pub condition: String,
    /// Delimiters around the final message.
    #[serde(default)]
    pub prefix_style: PrefixStyle,
    /// Resolve id/type/operator/extra/condition before the operation runs.
    #[serde(default = "default_evaluate_before")]
    pub evaluate_before_invocation: bool,
}

fn default_evaluate_before() -> bool {
    true
}

impl Directive {
    /// Create a new directive builder.
    pub fn builder(success_template: impl Into<String>) -> DirectiveBuilder {
        DirectiveBuilder::new(success_template)
    }

    /// The template matching an outcome.
    pub fn template_for(&self, success: bool) -> &str {
        if success {
            &self.success_template
        } else {
            &self.fail_template
        }
    }
}

/// Builder for constructing directives.
#[derive(Debug)]
pub struct DirectiveBuilder {
    directive: Directive,
}

impl DirectiveBuilder {
    /// Create a new builder.
    pub fn new(success_template: impl Into<String>) -> Self {
        Self {
            directive: Directive {
                success_template: success_template.into(),
                fail_template: String::new(),
                biz_id: String::new(),
                biz_type: String::new(),
                operator_id: String::new(),
                extra: String::new(),
                condition: String::new(),
                prefix_style: PrefixStyle::default(),
                evaluate_before_invocation: true,
            },
        }
    }

    /// Set the failure template.
    pub fn fail_template(mut self, expr: impl Into<String>) -> Self {
        self.directive.fail_template = expr.into();
        self
    }

    /// Set the business id expression.
    pub fn biz_id(mut self, expr: impl Into<String>) -> Self {
        self.directive.biz_id = expr.into();
        self
    }

    /// Set the business type expression.
    pub fn biz_type(mut self, expr: impl Into<String>) -> Self {
        self.directive.biz_type = expr.into();
        self
    }

    /// Set the operator id expression.
    pub fn operator_id(mut self, expr: impl Into<String>) -> Self {
        self.directive.operator_id = expr.into();
        self
    }

    /// Set the extra expression.
    pub fn extra(mut self, expr: impl Into<String>) -> Self {
        self.directive.extra = expr.into();
        self
    }

    /// Set the condition expression.
    pub fn condition(mut self, expr: impl Into<String>) -> Self {
        self.directive.condition = expr.into();
        self
    }

    /// Set the prefix style.
    pub fn prefix_style(mut self, style: PrefixStyle) -> Self {
        self.directive.prefix_style = style;
        self
    }

    /// Choose the evaluation phase.
    pub fn evaluate_before_invocation(mut self, before: bool) -> Self {
        self.directive.evaluate_before_invocation = before;
        self
    }

    /// Shorthand for `evaluate_before_invocation(false)`.
    pub fn after_invocation(self) -> Self {
        self.evaluate_before_invocation(false)
    }

    /// Build the directive.
    pub fn build(self) -> Directive {
        self.directive
    }
}
