//! A toy message consumer running handlers through named pipelines.
//!
//! Run with `RUST_LOG=resiliflow=debug` to see strategy events.

use resiliflow::prelude::*;
use resiliflow::pipeline::declarations_from_json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DECLARATIONS: &str = r#"[
    {
        "name": "payments",
        "strategies": [
            {"kind": "retry", "max_retry_attempts": 2, "base_delay_ms": 50, "backoff": "Constant"},
            {"kind": "timeout", "timeout_ms": 200}
        ]
    }
]"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = PipelineRegistry::<()>::from_declarations(&declarations_from_json(DECLARATIONS)?)?;
    registry.register("orders", |builder| {
        builder
            .add_continue_on_error(ContinueOnErrorOptions::new().on_error(|error, message| {
                error!(
                    message_type = %message.message_type,
                    message_id = ?message.message_id,
                    error = %error,
                    "Dropping poisoned message"
                );
            }))
            .add_retry(RetryOptions::new().with_max_retry_attempts(2).with_base_delay_ms(100));
    })?;
    let registry = Arc::new(registry);
    let pool = Arc::new(ContextPool::new());

    let orders = ResilienceExecutionStrategy::with_pool("orders", registry.clone(), pool.clone());
    let payments = ResilienceExecutionStrategy::with_pool("payments", registry, pool.clone());
    let shutdown = CancellationToken::new();

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let flaky = message_action(move |_| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            if attempt < 3 {
                anyhow::bail!("inventory service unavailable (attempt {attempt})");
            }
            Ok(())
        })
    });
    orders
        .execute(
            flaky,
            MessageContext::new("OrderPlaced").with_message_id("order-1"),
            shutdown.clone(),
        )
        .await?;
    info!(attempts = attempts.load(Ordering::SeqCst), "Order handled");

    let poisoned = message_action(|_| Box::pin(async { Err::<(), _>(anyhow::anyhow!("malformed order payload")) }));
    orders
        .execute(
            poisoned,
            MessageContext::new("OrderPlaced").with_message_id("order-2"),
            shutdown.clone(),
        )
        .await?;
    info!("Poisoned order skipped");

    let slow = message_action(|token| {
        Box::pin(async move {
            tokio::select! {
                () = tokio::time::sleep(std::time::Duration::from_secs(5)) => Ok(()),
                () = token.cancelled() => Err(anyhow::Error::new(Cancelled { reason: token.reason() })),
            }
        })
    });
    match payments
        .execute(slow, MessageContext::new("PaymentRequested"), shutdown.clone())
        .await
    {
        Ok(()) => info!("Payment handled"),
        Err(err) if err.downcast_ref::<TimeoutRejected>().is_some() => {
            info!(error = %err, "Payment timed out on every attempt");
        }
        Err(err) => return Err(err),
    }

    info!(retained = pool.retained(), "Contexts back in the pool");
    shutdown.cancel("demo finished");
    Ok(())
}
