//! Execution strategy implementations.

use crate::cancellation::CancellationToken;
use crate::context::{ContextPool, MessageContext, MESSAGE_CONTEXT_KEY};
use crate::pipeline::PipelineRegistry;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// The handler invocation a host passes to an execution strategy.
///
/// It receives the token the handler should observe.
pub type MessageAction =
    Box<dyn Fn(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Boxes a closure into a [`MessageAction`].
pub fn message_action<F>(action: F) -> MessageAction
where
    F: Fn(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
{
    Box::new(action)
}

/// How a host runs a message handler.
#[async_trait]
pub trait MessageHandlerExecutionStrategy: Send + Sync {
    /// Runs `action` for `message` under `token`.
    async fn execute(
        &self,
        action: MessageAction,
        message: MessageContext,
        token: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// Runs the handler once, with no resilience.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutionStrategy;

#[async_trait]
impl MessageHandlerExecutionStrategy for DirectExecutionStrategy {
    async fn execute(
        &self,
        action: MessageAction,
        _message: MessageContext,
        token: CancellationToken,
    ) -> anyhow::Result<()> {
        action(token).await
    }
}

/// Runs the handler through a named pipeline.
///
/// Each run borrows a context from the pool, stores the message under
/// [`MESSAGE_CONTEXT_KEY`], and returns the context on every exit path.
/// Outcomes are returned unchanged.
#[derive(Debug, Clone)]
pub struct ResilienceExecutionStrategy {
    pipeline_name: String,
    registry: Arc<PipelineRegistry>,
    pool: Arc<ContextPool>,
}

impl ResilienceExecutionStrategy {
    /// Creates an adapter with its own context pool.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>, registry: Arc<PipelineRegistry>) -> Self {
        Self::with_pool(pipeline_name, registry, Arc::new(ContextPool::new()))
    }

    /// Creates an adapter sharing an existing context pool.
    #[must_use]
    pub fn with_pool(
        pipeline_name: impl Into<String>,
        registry: Arc<PipelineRegistry>,
        pool: Arc<ContextPool>,
    ) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            registry,
            pool,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Returns the context pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }
}

#[async_trait]
impl MessageHandlerExecutionStrategy for ResilienceExecutionStrategy {
    async fn execute(
        &self,
        action: MessageAction,
        message: MessageContext,
        token: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut ctx = self.pool.acquire(token);
        ctx.set_operation_key(Some(self.pipeline_name.clone()));
        let message_type = message.message_type.clone();
        ctx.properties_mut().set(MESSAGE_CONTEXT_KEY, message);

        let pipeline = self.registry.resolve(&self.pipeline_name)?;

        let execution_id = ctx.execution_id();
        debug!(
            operation_key = %self.pipeline_name,
            message_type = %message_type,
            %execution_id,
            "Executing handler through resilience pipeline"
        );

        // The timeout strategy may have swapped in a child token by the time the action runs.
        let outcome = pipeline
            .execute(|ctx| action(ctx.cancellation_token().clone()), &mut ctx)
            .await;

        debug!(
            operation_key = %self.pipeline_name,
            message_type = %message_type,
            %execution_id,
            success = outcome.is_ok(),
            "Resilience pipeline finished"
        );

        ctx.release();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::errors::{Cancelled, PipelineConfigError, TimeoutRejected};
    use crate::pipeline::{Next, Outcome, ResilienceStrategy};
    use crate::strategies::{ContinueOnErrorOptions, RetryOptions, TimeoutOptions};
    use crate::testing::{RecordingStrategy, ScriptedAction, ScriptedFailure};
    use futures::FutureExt;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::panic::AssertUnwindSafe;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn adapter_for<F>(name: &str, configure: F) -> ResilienceExecutionStrategy
    where
        F: FnOnce(&mut crate::pipeline::ResiliencePipelineBuilder<()>),
    {
        let mut registry = PipelineRegistry::new();
        registry.register(name, configure).unwrap();
        ResilienceExecutionStrategy::new(name, Arc::new(registry))
    }

    struct OperationKeyCapture(Arc<Mutex<Option<String>>>);

    #[async_trait]
    impl ResilienceStrategy<()> for OperationKeyCapture {
        async fn execute(&self, next: Next<'_, ()>, ctx: &mut ExecutionContext) -> Outcome<()> {
            *self.0.lock() = ctx.operation_key().map(str::to_string);
            next.run(ctx).await
        }
    }

    #[tokio::test]
    async fn test_direct_strategy_runs_once() {
        let action = ScriptedAction::always_failing();

        let err = assert_err!(
            DirectExecutionStrategy
                .execute(action.message_action(), MessageContext::new("Order"), CancellationToken::new())
                .await
        );

        assert!(err.downcast_ref::<ScriptedFailure>().is_some());
        assert_eq!(action.calls(), 1);
    }

    #[tokio::test]
    async fn test_success_releases_context() {
        let adapter = adapter_for("orders", |_| {});
        let action = ScriptedAction::succeeding();

        assert_ok!(
            adapter
                .execute(action.message_action(), MessageContext::new("Order"), CancellationToken::new())
                .await
        );

        assert_eq!(action.calls(), 1);
        assert_eq!(adapter.pool().retained(), 1);
    }

    #[tokio::test]
    async fn test_failure_propagates_unchanged_and_releases_context() {
        let adapter = adapter_for("orders", |_| {});
        let action = ScriptedAction::always_failing();

        let err = assert_err!(
            adapter
                .execute(action.message_action(), MessageContext::new("Order"), CancellationToken::new())
                .await
        );

        assert_eq!(err.downcast_ref::<ScriptedFailure>(), Some(&ScriptedFailure { attempt: 1 }));
        assert_eq!(adapter.pool().retained(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_pipeline_is_configuration_error() {
        let adapter = ResilienceExecutionStrategy::new("missing", Arc::new(PipelineRegistry::new()));
        let action = ScriptedAction::succeeding();

        let err = assert_err!(
            adapter
                .execute(action.message_action(), MessageContext::new("Order"), CancellationToken::new())
                .await
        );

        assert_eq!(
            err.downcast_ref::<PipelineConfigError>(),
            Some(&PipelineConfigError::not_found("missing"))
        );
        assert_eq!(action.calls(), 0);
        assert_eq!(adapter.pool().retained(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_name_becomes_operation_key() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let adapter = adapter_for("orders", move |builder| {
            builder.add_strategy(move |_, _| OperationKeyCapture(sink), RecordingStrategy::options("capture"));
        });

        assert_ok!(
            adapter
                .execute(
                    ScriptedAction::succeeding().message_action(),
                    MessageContext::new("Order"),
                    CancellationToken::new()
                )
                .await
        );

        assert_eq!(seen.lock().as_deref(), Some("orders"));
    }

    #[tokio::test]
    async fn test_panicking_action_releases_context() {
        let adapter = adapter_for("orders", |_| {});
        let action = message_action(|_| panic!("handler bug"));

        let result = AssertUnwindSafe(adapter.execute(action, MessageContext::new("Order"), CancellationToken::new()))
            .catch_unwind()
            .await;

        assert!(result.is_err());
        assert_eq!(adapter.pool().retained(), 1);
    }

    #[tokio::test]
    async fn test_message_context_reaches_on_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let adapter = adapter_for("orders", move |builder| {
            builder.add_continue_on_error(
                ContinueOnErrorOptions::new().on_error(move |_, message| *sink.lock() = Some(message.clone())),
            );
        });
        let message = MessageContext::new("OrderPlaced").with_correlation_id("c-7");

        assert_ok!(
            adapter
                .execute(
                    ScriptedAction::always_failing().message_action(),
                    message.clone(),
                    CancellationToken::new()
                )
                .await
        );

        assert_eq!(seen.lock().clone(), Some(message));
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_observes_timeout_token() {
        let adapter = adapter_for("orders", |builder| {
            builder.add_timeout(TimeoutOptions::new().with_timeout_ms(20));
        });
        let host_token = CancellationToken::new();
        let handed = Arc::new(Mutex::new(None));
        let sink = handed.clone();
        let action = message_action(move |token| {
            *sink.lock() = Some(token.clone());
            Box::pin(async move {
                token.cancelled().await;
                Err::<(), _>(anyhow::Error::new(Cancelled { reason: token.reason() }))
            })
        });

        let err = assert_err!(adapter.execute(action, MessageContext::new("Order"), host_token.clone()).await);

        assert!(err.downcast_ref::<TimeoutRejected>().is_some());
        let handed = handed.lock().clone().unwrap();
        assert!(handed.is_cancelled());
        assert!(!host_token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_cancellation_is_not_suppressed() {
        let adapter = adapter_for("orders", |builder| {
            builder
                .continue_on_error()
                .add_retry(RetryOptions::new().with_base_delay_ms(1000));
        });
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel("shutdown");
        });
        let action = ScriptedAction::always_failing();

        let err = assert_err!(
            adapter
                .execute(action.message_action(), MessageContext::new("Order"), token)
                .await
        );

        assert!(crate::errors::is_cancellation(&err));
        assert_eq!(action.calls(), 1);
    }
}
