//! An order service whose operations are recorded through directives.
//!
//! Reads `bizlog.yaml` from `BIZLOG_CONFIG_DIR` (or the current directory),
//! applies `BIZLOG_*` overrides and logs every record at info level.

use bizlog_capture::{
    Arguments, Directive, FunctionError, FunctionRegistry, Interceptor, PrefixStyle, Value,
};
use bizlog_common_config::{ConfigLoader, Environment};
use bizlog_common_log::{info, init, LogConfig};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct Order {
    id: u64,
    customer: String,
    total_cents: u64,
}

fn place_order(customer: &str, total_cents: u64) -> Result<Order, String> {
    if total_cents == 0 {
        return Err("empty basket".to_string());
    }
    Ok(Order {
        id: 1001,
        customer: customer.to_string(),
        total_cents,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Environment::init()?;
    let config = ConfigLoader::from_env().load_with_overrides()?;
    init(LogConfig::from_settings(
        &config.log.level,
        &config.log.format,
        config.log.file.clone(),
    ))?;

    let functions = Arc::new(FunctionRegistry::new());
    functions.register("cents", |args| {
        FunctionError::check_arity(args, 1)?;
        let cents = args[0].as_u64().ok_or(FunctionError::InvalidArgument {
            index: 0,
            message: "expected cents".to_string(),
        })?;
        Ok(Value::String(format!("{}.{:02}", cents / 100, cents % 100)))
    });

    let interceptor = Interceptor::builder()
        .config(&config)
        .functions(functions)
        .directive_set(
            "order.place",
            vec![
                Directive::builder("#customer + ' placed order ' + #_result.id + ' for ' + #cents(#total)")
                    .fail_template("#customer + ' could not order: ' + #_errorMessage")
                    .biz_id("#_result.id")
                    .biz_type("'order'")
                    .operator_id("#customer")
                    .prefix_style(PrefixStyle::SquareBrackets)
                    .after_invocation()
                    .build(),
                Directive::builder("'large order by ' + #customer")
                    .biz_type("'risk'")
                    .condition("#large")
                    .build(),
            ],
        )
        .build()?;

    for (customer, total) in [("ana", 4_250u64), ("bo", 0), ("cy", 125_000)] {
        let args = Arguments::new()
            .arg("customer", customer)
            .arg("total", total)
            .arg("large", total > 100_000);
        match interceptor.invoke("order.place", args, || place_order(customer, total)) {
            Ok(order) => info!(
                order_id = order.id,
                customer = %order.customer,
                total_cents = order.total_cents,
                "order placed"
            ),
            Err(e) => info!(error = %e, "order rejected"),
        }
    }

    interceptor.shutdown();
    let stats = interceptor.stats();
    info!(delivered = stats.delivered, failed = stats.failed, "done");
    Ok(())
}
