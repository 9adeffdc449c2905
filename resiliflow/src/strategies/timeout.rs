//! Timeout strategy.

use crate::context::ExecutionContext;
use crate::errors::{PipelineConfigError, TimeoutRejected};
use crate::pipeline::{Next, Outcome, ResiliencePipelineBuilder, ResilienceStrategy, StrategyOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Options for [`TimeoutStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOptions {
    /// The strategy name.
    pub name: String,
    /// Deadline for the rest of the pipeline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            name: "Timeout".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl TimeoutOptions {
    /// Creates timeout options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strategy name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns the deadline as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl StrategyOptions for TimeoutOptions {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.timeout_ms == 0 {
            return Err(PipelineConfigError::invalid_options(&self.name, "timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// Strategy that bounds the rest of the pipeline by a deadline.
///
/// The inner call runs under a child of the context's token. When the deadline
/// passes the child is cancelled, the inner future is dropped, and the outer
/// token is put back.
pub struct TimeoutStrategy {
    options: TimeoutOptions,
}

impl TimeoutStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(options: TimeoutOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl<T: Send + 'static> ResilienceStrategy<T> for TimeoutStrategy {
    async fn execute(&self, next: Next<'_, T>, ctx: &mut ExecutionContext) -> Outcome<T> {
        let timeout = self.options.timeout();
        let child = ctx.cancellation_token().child_token();
        let outer = ctx.replace_cancellation_token(child.clone());

        let result = tokio::time::timeout(timeout, next.run(ctx)).await;
        ctx.replace_cancellation_token(outer);

        match result {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                child.cancel(format!("{} exceeded {}ms", self.options.name, self.options.timeout_ms));
                warn!(
                    strategy = %self.options.name,
                    operation_key = ctx.operation_key().unwrap_or_default(),
                    timeout_ms = self.options.timeout_ms,
                    "Execution timed out"
                );
                Err(TimeoutRejected::new(timeout).into())
            }
        }
    }
}

impl<T: Send + 'static> ResiliencePipelineBuilder<T> {
    /// Appends a timeout strategy.
    pub fn add_timeout(&mut self, options: TimeoutOptions) -> &mut Self {
        self.add_strategy(|_, options| TimeoutStrategy::new(options), options)
    }
}
