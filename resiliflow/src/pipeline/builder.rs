//! Pipeline builder with options validation.

use super::{ResiliencePipeline, ResilienceStrategy, StrategyBuildContext, StrategyOptions};
use crate::errors::PipelineConfigError;
use std::sync::Arc;

type StrategyFactory<T> =
    Box<dyn FnOnce(&StrategyBuildContext) -> Arc<dyn ResilienceStrategy<T>> + Send>;

struct PendingStrategy<T: Send + 'static> {
    name: String,
    validation: Result<(), PipelineConfigError>,
    factory: StrategyFactory<T>,
}

/// Builder for [`ResiliencePipeline`]s.
///
/// Strategies run in the order they are added: the first one added is the
/// outermost layer, so it sees the call first and the final outcome last.
pub struct ResiliencePipelineBuilder<T: Send + 'static> {
    /// The pipeline name.
    name: Option<String>,
    /// Strategies in registration order.
    pending: Vec<PendingStrategy<T>>,
}

impl<T: Send + 'static> ResiliencePipelineBuilder<T> {
    /// Creates a new unnamed builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            pending: Vec::new(),
        }
    }

    /// Creates a builder for a named pipeline.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            pending: Vec::new(),
        }
    }

    /// Appends a strategy.
    ///
    /// The options are validated when the pipeline is built; the factory is
    /// invoked exactly once, at build time, and receives the options.
    pub fn add_strategy<O, S, F>(&mut self, factory: F, options: O) -> &mut Self
    where
        O: StrategyOptions + Send + 'static,
        S: ResilienceStrategy<T> + 'static,
        F: FnOnce(&StrategyBuildContext, O) -> S + Send + 'static,
    {
        let name = options.name().to_string();
        let validation = options.validate();
        let boxed: StrategyFactory<T> = Box::new(
            move |ctx: &StrategyBuildContext| -> Arc<dyn ResilienceStrategy<T>> {
                Arc::new(factory(ctx, options))
            },
        );
        self.pending.push(PendingStrategy {
            name,
            validation,
            factory: boxed,
        });
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first options validation error, tagged with the pipeline name.
    pub fn build(self) -> Result<ResiliencePipeline<T>, PipelineConfigError> {
        for pending in &self.pending {
            if let Err(err) = &pending.validation {
                return Err(err.clone().in_pipeline(self.name.as_deref()));
            }
        }

        let mut names = Vec::with_capacity(self.pending.len());
        let mut strategies = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let ctx = StrategyBuildContext {
                pipeline_name: self.name.clone(),
                strategy_name: pending.name.clone(),
            };
            strategies.push((pending.factory)(&ctx));
            names.push(pending.name);
        }

        Ok(ResiliencePipeline::new(self.name, strategies, names))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the number of strategies added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no strategy has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: Send + 'static> Default for ResiliencePipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for ResiliencePipelineBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResiliencePipelineBuilder")
            .field("name", &self.name)
            .field(
                "strategies",
                &self.pending.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
