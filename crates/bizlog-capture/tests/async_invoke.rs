mod common;

use bizlog_capture::{Arguments, Directive};
use common::interceptor;
use futures_util::FutureExt;
use std::time::Duration;

#[tokio::test]
async fn test_async_success_binds_result() {
    let (interceptor, sink) = interceptor(
        "invoice.issue",
        vec![Directive::builder("'issued invoice ' + #_result")
            .biz_id("#customer")
            .after_invocation()
            .build()],
    );

    let out: Result<u32, String> = interceptor
        .invoke_async(
            "invoice.issue",
            Arguments::new().arg("customer", "c-17"),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(3141)
            },
        )
        .await;
    interceptor.shutdown();

    assert_eq!(out, Ok(3141));
    let record = &sink.records()[0];
    assert!(record.success);
    assert_eq!(record.biz_id.as_deref(), Some("c-17"));
    assert_eq!(record.template_message.as_deref(), Some("issued invoice 3141"));
    assert!(record.execution_time_millis >= 5);
}

#[tokio::test]
async fn test_async_error_propagates() {
    let (interceptor, sink) = interceptor(
        "invoice.void",
        vec![Directive::builder("'voided'")
            .fail_template("'void failed: ' + #_errorMessage")
            .build()],
    );

    let out: Result<(), String> = interceptor
        .invoke_async("invoice.void", Arguments::new(), async {
            Err("already paid".to_string())
        })
        .await;
    interceptor.shutdown();

    assert_eq!(out, Err("already paid".to_string()));
    let record = &sink.records()[0];
    assert!(!record.success);
    assert_eq!(record.template_message.as_deref(), Some("void failed: already paid"));
}

async fn render_invoice() -> Result<(), String> {
    panic!("renderer crashed")
}

#[tokio::test]
async fn test_async_panic_is_resumed() {
    let (interceptor, sink) = interceptor("invoice.crash", vec![Directive::builder("'x'").build()]);

    let caught = std::panic::AssertUnwindSafe(interceptor.invoke_async(
        "invoice.crash",
        Arguments::new(),
        render_invoice(),
    ))
    .catch_unwind()
    .await;
    interceptor.shutdown();

    assert!(caught.is_err());
    let record = &sink.records()[0];
    assert!(!record.success);
    assert_eq!(record.exception_message.as_deref(), Some("renderer crashed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_calls_use_separate_contexts() {
    let (interceptor, sink) = interceptor(
        "job.run",
        vec![Directive::builder("'job ' + #job")
            .biz_id("#job")
            .after_invocation()
            .build()],
    );

    let tasks: Vec<_> = (0..16)
        .map(|job| {
            let interceptor = interceptor.clone();
            tokio::spawn(async move {
                interceptor
                    .invoke_async("job.run", Arguments::new().arg("job", job), async move {
                        tokio::time::sleep(Duration::from_millis((16 - job) as u64)).await;
                        Ok::<_, String>(job)
                    })
                    .await
            })
        })
        .collect();

    for (job, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), Ok(job as i32));
    }
    interceptor.shutdown();

    let records = sink.records();
    assert_eq!(records.len(), 16);
    for record in &records {
        assert_eq!(
            record.template_message.as_deref(),
            Some(format!("job {}", record.biz_id.as_deref().unwrap_or("?")).as_str())
        );
    }
}

#[tokio::test]
async fn test_async_unregistered_operation_passes_through() {
    let (interceptor, sink) = interceptor("registered", vec![Directive::builder("'x'").build()]);

    let out: Result<&str, String> = interceptor
        .invoke_async("unregistered", Arguments::new(), async { Ok("plain") })
        .await;
    interceptor.shutdown();

    assert_eq!(out, Ok("plain"));
    assert_eq!(sink.len(), 0);
}
