//! Continue-on-error strategy.
//!
//! Turns a handled failure into a successful default outcome after reporting
//! it, so a poisoned message does not block its consumer.

use super::{default_should_handle, ShouldHandlePredicate};
use crate::context::{ExecutionContext, MessageContext};
use crate::errors::OnErrorPanicked;
use crate::pipeline::{Next, Outcome, ResiliencePipelineBuilder, ResilienceStrategy, StrategyOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Callback reporting an absorbed error together with the message it came from.
pub type OnErrorCallback =
    Arc<dyn Fn(&anyhow::Error, &MessageContext) -> anyhow::Result<()> + Send + Sync>;

fn noop_on_error() -> OnErrorCallback {
    Arc::new(|_, _| Ok(()))
}

fn default_name() -> String {
    "ContinueOnError".to_string()
}

/// Options for [`ContinueOnErrorStrategy`].
///
/// Register this strategy before any retry strategy so that it sees the
/// outcome only after retries are exhausted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinueOnErrorOptions {
    /// The strategy name.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(skip, default = "noop_on_error")]
    on_error: OnErrorCallback,
    #[serde(skip, default = "default_should_handle")]
    should_handle: ShouldHandlePredicate,
}

impl Default for ContinueOnErrorOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            on_error: noop_on_error(),
            should_handle: default_should_handle(),
        }
    }
}

impl ContinueOnErrorOptions {
    /// Creates options with a no-op reporter that handle every non-cancellation error.
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

    /// Sets an infallible error reporter.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&anyhow::Error, &MessageContext) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(move |error, message| {
            callback(error, message);
            Ok(())
        });
        self
    }

    /// Sets a fallible error reporter. A reporter error replaces the outcome.
    #[must_use]
    pub fn try_on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&anyhow::Error, &MessageContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
        self
    }

    /// Sets the predicate selecting which errors are absorbed.
    #[must_use]
    pub fn should_handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.should_handle = Arc::new(predicate);
        self
    }
}

impl StrategyOptions for ContinueOnErrorOptions {
    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ContinueOnErrorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinueOnErrorOptions")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Strategy that reports handled errors and replaces them with `T::default()`.
pub struct ContinueOnErrorStrategy {
    options: ContinueOnErrorOptions,
}

impl ContinueOnErrorStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(options: ContinueOnErrorOptions) -> Self {
        Self { options }
    }

    fn report(&self, error: &anyhow::Error, message: &MessageContext) -> anyhow::Result<()> {
        match catch_unwind(AssertUnwindSafe(|| (self.options.on_error)(error, message))) {
            Ok(result) => result,
            Err(payload) => Err(OnErrorPanicked {
                message: panic_message(payload.as_ref()),
            }
            .into()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[async_trait]
impl<T: Default + Send + 'static> ResilienceStrategy<T> for ContinueOnErrorStrategy {
    async fn execute(&self, next: Next<'_, T>, ctx: &mut ExecutionContext) -> Outcome<T> {
        let error = match next.run(ctx).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !(self.options.should_handle)(&error) {
            return Err(error);
        }

        let placeholder = MessageContext::default();
        let message = ctx.message_context().unwrap_or(&placeholder);

        warn!(
            strategy = %self.options.name,
            operation_key = ctx.operation_key().unwrap_or_default(),
            message_type = %message.message_type,
            error = %error,
            "Continuing after handler error"
        );

        self.report(&error, message)?;
        Ok(T::default())
    }
}

impl<T: Default + Send + 'static> ResiliencePipelineBuilder<T> {
    /// Appends a continue-on-error strategy with default options.
    pub fn continue_on_error(&mut self) -> &mut Self {
        self.add_continue_on_error(ContinueOnErrorOptions::default())
    }

    /// Appends a continue-on-error strategy.
    pub fn add_continue_on_error(&mut self, options: ContinueOnErrorOptions) -> &mut Self {
        self.add_strategy(|_, options| ContinueOnErrorStrategy::new(options), options)
    }
}
