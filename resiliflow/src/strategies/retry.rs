//! Retry strategy with backoff and jitter.

use super::{default_should_handle, ShouldHandlePredicate};
use crate::context::ExecutionContext;
use crate::errors::{Cancelled, PipelineConfigError};
use crate::pipeline::{Next, Outcome, ResiliencePipelineBuilder, ResilienceStrategy, StrategyOptions};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// delay = base
    Constant,
    /// delay = base * attempt
    Linear,
    /// delay = base * 2^(attempt - 1)
    #[default]
    Exponential,
}

impl BackoffStrategy {
    /// Calculates the un-jittered delay in milliseconds for a 1-based retry attempt.
    #[must_use]
    pub fn delay_ms(self, base_ms: u64, attempt: u32) -> u64 {
        match self {
            Self::Constant => base_ms,
            Self::Linear => base_ms.saturating_mul(u64::from(attempt)),
            Self::Exponential => {
                base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

/// Jitter strategy to spread out concurrent retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay in milliseconds.
    #[must_use]
    pub fn apply(self, delay_ms: u64) -> u64 {
        match self {
            Self::None => delay_ms,
            Self::Full => {
                if delay_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay_ms)
                }
            }
            Self::Equal => {
                let half = delay_ms / 2;
                if half == 0 {
                    delay_ms
                } else {
                    delay_ms - half + rand::thread_rng().gen_range(0..=half)
                }
            }
        }
    }
}

/// Details of a retry about to happen, passed to the `on_retry` callback.
#[derive(Debug)]
pub struct RetryAttempt<'a> {
    /// The 1-based retry number (the first retry is attempt 1).
    pub attempt: u32,
    /// The delay before the retry runs.
    pub delay: Duration,
    /// The error that triggered the retry.
    pub error: &'a anyhow::Error,
}

/// Callback invoked before every retry.
pub type OnRetryCallback = Arc<dyn Fn(&RetryAttempt<'_>) + Send + Sync>;

fn default_name() -> String {
    "Retry".to_string()
}

/// Options for [`RetryStrategy`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// The strategy name.
    pub name: String,
    /// Retries after the first attempt.
    pub max_retry_attempts: u32,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    #[serde(skip, default = "default_should_handle")]
    should_handle: ShouldHandlePredicate,
    #[serde(skip)]
    on_retry: Option<OnRetryCallback>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_retry_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::None,
            should_handle: default_should_handle(),
            on_retry: None,
        }
    }
}

impl RetryOptions {
    /// Creates retry options with defaults.
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

    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Sets the predicate selecting which errors are retried.
    #[must_use]
    pub fn should_handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.should_handle = Arc::new(predicate);
        self
    }

    /// Sets a callback invoked before every retry.
    #[must_use]
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RetryAttempt<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Calculates the delay before a 1-based retry attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let capped = self
            .backoff
            .delay_ms(self.base_delay_ms, attempt)
            .min(self.max_delay_ms);
        Duration::from_millis(self.jitter.apply(capped))
    }
}

impl StrategyOptions for RetryOptions {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.max_retry_attempts == 0 {
            return Err(PipelineConfigError::invalid_options(
                &self.name,
                "max_retry_attempts must be >= 1",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(PipelineConfigError::invalid_options(
                &self.name,
                format!(
                    "max_delay_ms ({}) must be >= base_delay_ms ({})",
                    self.max_delay_ms, self.base_delay_ms
                ),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOptions")
            .field("name", &self.name)
            .field("max_retry_attempts", &self.max_retry_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

/// Strategy that re-runs the rest of the pipeline on handled errors.
pub struct RetryStrategy {
    options: RetryOptions,
}

impl RetryStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl<T: Send + 'static> ResilienceStrategy<T> for RetryStrategy {
    async fn execute(&self, next: Next<'_, T>, ctx: &mut ExecutionContext) -> Outcome<T> {
        let mut attempt = 0;
        loop {
            let error = match next.run(ctx).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.options.max_retry_attempts || !(self.options.should_handle)(&error) {
                return Err(error);
            }
            attempt += 1;

            let token = ctx.cancellation_token().clone();
            if token.is_cancelled() {
                return Err(Cancelled { reason: token.reason() }.into());
            }

            let delay = self.options.delay_for(attempt);
            debug!(
                strategy = %self.options.name,
                operation_key = ctx.operation_key().unwrap_or_default(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Retrying after error"
            );
            if let Some(on_retry) = &self.options.on_retry {
                on_retry(&RetryAttempt {
                    attempt,
                    delay,
                    error: &error,
                });
            }

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = token.cancelled() => {
                    return Err(Cancelled { reason: token.reason() }.into());
                }
            }
        }
    }
}

impl<T: Send + 'static> ResiliencePipelineBuilder<T> {
    /// Appends a retry strategy.
    pub fn add_retry(&mut self, options: RetryOptions) -> &mut Self {
        self.add_strategy(|_, options| RetryStrategy::new(options), options)
    }
}
