//! Built-in resilience strategies.
//!
//! Each strategy comes with an options type implementing
//! [`StrategyOptions`](crate::pipeline::StrategyOptions) and an extension
//! method on [`ResiliencePipelineBuilder`](crate::pipeline::ResiliencePipelineBuilder).

mod continue_on_error;
mod retry;
mod timeout;

use crate::errors::is_cancellation;
use std::sync::Arc;

pub use continue_on_error::{ContinueOnErrorOptions, ContinueOnErrorStrategy, OnErrorCallback};
pub use retry::{BackoffStrategy, JitterStrategy, OnRetryCallback, RetryAttempt, RetryOptions, RetryStrategy};
pub use timeout::{TimeoutOptions, TimeoutStrategy};

/// Predicate deciding whether a strategy handles an error.
pub type ShouldHandlePredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// The default predicate: every error except a cancellation.
#[must_use]
pub fn default_should_handle() -> ShouldHandlePredicate {
    Arc::new(|error| !is_cancellation(error))
}
