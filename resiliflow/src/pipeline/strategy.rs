//! The strategy composition protocol.

use crate::context::ExecutionContext;
use crate::errors::PipelineConfigError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// The result of every strategy layer and of the innermost action.
///
/// The error keeps its concrete type; recover it with [`anyhow::Error::downcast_ref`].
pub type Outcome<T> = Result<T, anyhow::Error>;

/// The innermost callback a pipeline wraps.
///
/// Implemented for every `Fn(&mut ExecutionContext) -> BoxFuture<'_, Outcome<T>>`.
pub trait Callback<T>:
    for<'c> Fn(&'c mut ExecutionContext) -> BoxFuture<'c, Outcome<T>> + Send + Sync
{
}

impl<T, F> Callback<T> for F where
    F: for<'c> Fn(&'c mut ExecutionContext) -> BoxFuture<'c, Outcome<T>> + Send + Sync
{
}

/// A composable interception unit.
///
/// A strategy receives the continuation for the rest of the pipeline and may
/// run it zero or more times, run it under a deadline, replace its outcome, or
/// refuse to run it.
#[async_trait]
pub trait ResilienceStrategy<T: Send + 'static>: Send + Sync {
    /// Executes the strategy around `next`.
    async fn execute(&self, next: Next<'_, T>, ctx: &mut ExecutionContext) -> Outcome<T>;
}

/// Continuation over the remaining strategies and the innermost callback.
pub struct Next<'a, T: Send + 'static> {
    strategies: &'a [Arc<dyn ResilienceStrategy<T>>],
    callback: &'a dyn Callback<T>,
}

impl<'a, T: Send + 'static> Next<'a, T> {
    pub(crate) fn new(
        strategies: &'a [Arc<dyn ResilienceStrategy<T>>],
        callback: &'a dyn Callback<T>,
    ) -> Self {
        Self {
            strategies,
            callback,
        }
    }

    /// Runs the rest of the pipeline.
    pub async fn run(self, ctx: &mut ExecutionContext) -> Outcome<T> {
        match self.strategies.split_first() {
            Some((head, rest)) => head.execute(Next::new(rest, self.callback), ctx).await,
            None => (self.callback)(ctx).await,
        }
    }

    /// Returns the number of strategies still ahead of the callback.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.strategies.len()
    }
}

impl<T: Send + 'static> Clone for Next<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Send + 'static> Copy for Next<'_, T> {}

/// Options value owned by one strategy kind.
pub trait StrategyOptions {
    /// Returns the strategy name used in logs and errors.
    fn name(&self) -> &str;

    /// Validates the options.
    fn validate(&self) -> Result<(), PipelineConfigError> {
        Ok(())
    }
}

/// Information handed to a strategy factory at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyBuildContext {
    /// The pipeline being built, if named.
    pub pipeline_name: Option<String>,
    /// The strategy options name.
    pub strategy_name: String,
}
