//! Turns directives into records using the invocation context.

use bizlog_expr::{ExpressionEngine, InvocationContext};
use bizlog_types::{Directive, PrefixStyle, Record, RecordField};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds and finalizes records for one directive at a time.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    engine: Arc<ExpressionEngine>,
}

impl RecordAssembler {
    /// Create an assembler over a shared expression engine.
    pub fn new(engine: Arc<ExpressionEngine>) -> Self {
        Self { engine }
    }

    /// The expression engine used for every field.
    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    /// Create a pending record, or `None` when the directive's condition is not met.
    ///
    /// A blank condition always records. Each field that fails to evaluate
    /// is left empty without affecting the others.
    pub fn create_record(&self, directive: &Directive, ctx: &InvocationContext) -> Option<Record> {
        if !directive.condition.trim().is_empty()
            && !self.engine.evaluate_condition(&directive.condition, ctx)
        {
            debug!(condition = %directive.condition, "condition not met, no record");
            return None;
        }

        let mut record = Record::new();
        record.biz_id = self.engine.evaluate(&directive.biz_id, ctx);
        record.biz_type = self.engine.evaluate(&directive.biz_type, ctx);
        record.operator_id = self.engine.evaluate(&directive.operator_id, ctx);
        record.extra = self.engine.evaluate(&directive.extra, ctx);
        Some(record)
    }

    /// Render the outcome template and set the record's final message.
    pub fn finalize_message(&self, directive: &Directive, record: &mut Record, ctx: &InvocationContext) {
        let template = directive.template_for(record.success);
        record.template_message = self.engine.evaluate(template, ctx);

        let message = render_fields(record, directive.prefix_style);
        if let Err(e) = record.finalize(message) {
            warn!(error = %e, "final message already set, keeping the first");
        }
    }
}

/// Render every [`RecordField`] as `name=value`, joined by `", "` and
/// wrapped in the style's delimiters. Missing values render empty.
pub fn render_fields(record: &Record, style: PrefixStyle) -> String {
    let body = RecordField::ALL
        .iter()
        .map(|field| format!("{}={}", field.name(), record.field_value(*field).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(", ");
    style.wrap(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizlog_expr::{Arguments, FunctionError, FunctionRegistry};
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    fn context(args: Arguments) -> InvocationContext {
        let mut ctx = InvocationContext::new();
        ctx.bind_arguments(args);
        ctx
    }

    #[test]
    fn test_create_record_evaluates_fields() {
        let assembler = RecordAssembler::default();
        let directive = Directive::builder("'ok'")
            .biz_id("#orderId")
            .biz_type("'order'")
            .operator_id("#user.name")
            .extra("'qty=' + #qty")
            .build();
        let ctx = context(
            Arguments::new()
                .arg("orderId", 42)
                .arg("user", json!({"name": "ann"}))
                .arg("qty", 3),
        );

        let record = assembler.create_record(&directive, &ctx).unwrap();
        assert_eq!(record.biz_id.as_deref(), Some("42"));
        assert_eq!(record.biz_type.as_deref(), Some("order"));
        assert_eq!(record.operator_id.as_deref(), Some("ann"));
        assert_eq!(record.extra.as_deref(), Some("qty=3"));
        assert!(record.success);
        assert!(!record.is_finalized());
    }

    #[test_case("" => true ; "blank condition records")]
    #[test_case("true" => true ; "literal true")]
    #[test_case("'true'" => true ; "string true")]
    #[test_case("false" => false ; "literal false")]
    #[test_case("'yes'" => false ; "other string")]
    #[test_case("#missing" => false ; "unbound variable")]
    #[test_case("#flag == 1" => true ; "comparison")]
    #[test_case("#flag +" => false ; "syntax error")]
    fn test_condition_gates_record(condition: &str) -> bool {
        let assembler = RecordAssembler::default();
        let directive = Directive::builder("'ok'").condition(condition).build();
        let ctx = context(Arguments::new().arg("flag", 1));
        assembler.create_record(&directive, &ctx).is_some()
    }

    #[test]
    fn test_failed_field_blanks_only_itself() {
        let functions = Arc::new(FunctionRegistry::new());
        functions.register("boom", |_| Err(FunctionError::failed("kaput")));

        let mut ctx = context(Arguments::new().arg("orderId", 7));
        functions.bind_into(&mut ctx);

        let directive = Directive::builder("'ok'")
            .biz_id("#orderId")
            .biz_type("#boom()")
            .operator_id("#nobody.name")
            .build();

        let record = RecordAssembler::default().create_record(&directive, &ctx).unwrap();
        assert_eq!(record.biz_id.as_deref(), Some("7"));
        assert_eq!(record.biz_type, None);
        assert_eq!(record.operator_id, None);
    }

    #[test]
    fn test_finalize_uses_outcome_template() {
        let assembler = RecordAssembler::default();
        let directive = Directive::builder("'paid ' + #orderId")
            .fail_template("'payment failed: ' + #_errorMessage")
            .build();

        let mut ctx = context(Arguments::new().arg("orderId", 9));
        let mut ok = assembler.create_record(&directive, &ctx).unwrap();
        assembler.finalize_message(&directive, &mut ok, &ctx);
        assert_eq!(ok.template_message.as_deref(), Some("paid 9"));

        ctx.bind_parameter("_errorMessage", json!("card declined"));
        let mut failed = assembler.create_record(&directive, &ctx).unwrap();
        failed.fail("card declined");
        assembler.finalize_message(&directive, &mut failed, &ctx);
        assert_eq!(
            failed.template_message.as_deref(),
            Some("payment failed: card declined")
        );
        assert!(failed.final_message().contains("exceptionMessage=card declined"));
    }

    #[test]
    fn test_blank_template_leaves_message_empty() {
        let assembler = RecordAssembler::default();
        let directive = Directive::builder("'ok'").build();
        let ctx = InvocationContext::new();

        let mut record = assembler.create_record(&directive, &ctx).unwrap();
        record.fail("boom");
        assembler.finalize_message(&directive, &mut record, &ctx);

        assert_eq!(record.template_message, None);
        assert!(record.final_message().contains("templateMessage=,"));
    }

    #[test]
    fn test_finalize_twice_keeps_first_message() {
        let assembler = RecordAssembler::default();
        let directive = Directive::builder("'one'").build();
        let ctx = InvocationContext::new();

        let mut record = assembler.create_record(&directive, &ctx).unwrap();
        assembler.finalize_message(&directive, &mut record, &ctx);
        let first = record.final_message().to_string();

        let other = Directive::builder("'two'").prefix_style(PrefixStyle::None).build();
        assembler.finalize_message(&other, &mut record, &ctx);
        assert_eq!(record.final_message(), first);
    }

    #[test]
    fn test_fallback_message_shape() {
        let mut record = Record::new();
        record.biz_id = Some("42".to_string());
        record.biz_type = Some("order".to_string());
        record.execution_time_millis = 15;

        let message = render_fields(&record, PrefixStyle::SquareBrackets);
        assert!(message.starts_with("[bizId=42, bizType=order, operatorId=, extra=, success=true, exceptionMessage=, executionTimeMillis=15, templateMessage=, id="));
        assert!(message.ends_with(']'));
        assert!(message.contains(&format!("id={}", record.id)));
    }

    #[test_case(PrefixStyle::None, "", "" ; "none")]
    #[test_case(PrefixStyle::FullwidthBrackets, "【", "】" ; "fullwidth")]
    #[test_case(PrefixStyle::SquareBrackets, "[", "]" ; "square")]
    #[test_case(PrefixStyle::Parens, "(", ")" ; "parens")]
    #[test_case(PrefixStyle::AngleBrackets, "<", ">" ; "angle")]
    fn test_prefix_styles(style: PrefixStyle, prefix: &str, suffix: &str) {
        let message = render_fields(&Record::new(), style);
        assert!(message.starts_with(&format!("{}bizId=", prefix)));
        assert!(message.ends_with(suffix));
    }

    proptest! {
        #[test]
        fn prop_every_field_rendered_in_order(
            biz_id in "[a-z0-9]{0,12}",
            operator in "[a-z]{0,8}",
            millis in 0i64..100_000,
        ) {
            let mut record = Record::new();
            record.biz_id = Some(biz_id.clone());
            record.operator_id = Some(operator.clone());
            record.execution_time_millis = millis;

            let message = render_fields(&record, PrefixStyle::None);
            let names: Vec<&str> = message
                .split(", ")
                .filter_map(|pair| pair.split_once('=').map(|(name, _)| name))
                .collect();
            let expected: Vec<&str> = RecordField::ALL.iter().map(|f| f.name()).collect();
            prop_assert_eq!(names, expected);

            let biz_id_pair = format!("bizId={}", biz_id);
            prop_assert!(message.starts_with(&biz_id_pair));
            let millis_pair = format!("executionTimeMillis={}", millis);
            prop_assert!(message.contains(&millis_pair));
        }
    }
}
