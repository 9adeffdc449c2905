//! A built, frozen chain of strategies.

use super::{Next, Outcome, ResilienceStrategy};
use crate::cancellation::CancellationToken;
use crate::context::ExecutionContext;
use futures::future::BoxFuture;
use std::sync::Arc;

/// An ordered chain of strategies wrapping one asynchronous callback.
///
/// Built by [`ResiliencePipelineBuilder`](super::ResiliencePipelineBuilder) and
/// never mutated afterwards. The first strategy is the outermost layer.
pub struct ResiliencePipeline<T: Send + 'static> {
    name: Option<String>,
    strategies: Vec<Arc<dyn ResilienceStrategy<T>>>,
    strategy_names: Vec<String>,
}

impl<T: Send + 'static> ResiliencePipeline<T> {
    pub(crate) fn new(
        name: Option<String>,
        strategies: Vec<Arc<dyn ResilienceStrategy<T>>>,
        strategy_names: Vec<String>,
    ) -> Self {
        Self {
            name,
            strategies,
            strategy_names,
        }
    }

    /// Executes `callback` through every strategy using a caller-owned context.
    ///
    /// ```rust,ignore
    /// let outcome = pipeline
    ///     .execute(|ctx| Box::pin(async move { handle(ctx.cancellation_token()).await }), &mut ctx)
    ///     .await;
    /// ```
    pub async fn execute<F>(&self, callback: F, ctx: &mut ExecutionContext) -> Outcome<T>
    where
        F: for<'c> Fn(&'c mut ExecutionContext) -> BoxFuture<'c, Outcome<T>> + Send + Sync,
    {
        Next::new(&self.strategies, &callback).run(ctx).await
    }

    /// Executes `callback` with a fresh context whose token is never cancelled.
    pub async fn run<F>(&self, callback: F) -> Outcome<T>
    where
        F: for<'c> Fn(&'c mut ExecutionContext) -> BoxFuture<'c, Outcome<T>> + Send + Sync,
    {
        let mut ctx = ExecutionContext::new(CancellationToken::new());
        self.execute(callback, &mut ctx).await
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the strategy names, outermost first.
    #[must_use]
    pub fn strategy_names(&self) -> &[String] {
        &self.strategy_names
    }

    /// Returns the number of strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if the pipeline has no strategies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl<T: Send + 'static> std::fmt::Debug for ResiliencePipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResiliencePipeline")
            .field("name", &self.name)
            .field("strategies", &self.strategy_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PropertyKey, ResilienceProperties};
    use crate::pipeline::{ResiliencePipelineBuilder, StrategyOptions};
    use async_trait::async_trait;
    use std::future::ready;

    const SEEN_BY: PropertyKey<Vec<&'static str>> = PropertyKey::new("seen_by");

    struct StampOptions(&'static str);

    impl StrategyOptions for StampOptions {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct StampStrategy(&'static str);

    #[async_trait]
    impl ResilienceStrategy<usize> for StampStrategy {
        async fn execute(&self, next: Next<'_, usize>, ctx: &mut ExecutionContext) -> Outcome<usize> {
            stamp(ctx.properties_mut(), self.0);
            next.run(ctx).await
        }
    }

    fn stamp(props: &mut ResilienceProperties, label: &'static str) {
        if let Some(seen) = props.get_mut(SEEN_BY) {
            seen.push(label);
        } else {
            props.set(SEEN_BY, vec![label]);
        }
    }

    const REMAINING: PropertyKey<Vec<usize>> = PropertyKey::new("remaining");

    struct DepthStrategy;

    #[async_trait]
    impl ResilienceStrategy<usize> for DepthStrategy {
        async fn execute(&self, next: Next<'_, usize>, ctx: &mut ExecutionContext) -> Outcome<usize> {
            let remaining = next.remaining();
            match ctx.properties_mut().get_mut(REMAINING) {
                Some(depths) => depths.push(remaining),
                None => ctx.properties_mut().set(REMAINING, vec![remaining]),
            }
            next.run(ctx).await
        }
    }

    struct ShortCircuitStrategy;

    #[async_trait]
    impl ResilienceStrategy<usize> for ShortCircuitStrategy {
        async fn execute(&self, _next: Next<'_, usize>, _ctx: &mut ExecutionContext) -> Outcome<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_strategies_share_context_properties() {
        let mut builder = ResiliencePipelineBuilder::<usize>::new();
        builder
            .add_strategy(|_, o: StampOptions| StampStrategy(o.0), StampOptions("a"))
            .add_strategy(|_, o: StampOptions| StampStrategy(o.0), StampOptions("b"));
        let pipeline = builder.build().unwrap();

        let mut ctx = ExecutionContext::new(CancellationToken::new());
        let seen = pipeline
            .execute(
                |ctx| {
                    let count = ctx.properties().get(SEEN_BY).map_or(0, Vec::len);
                    Box::pin(ready(Ok(count)))
                },
                &mut ctx,
            )
            .await
            .unwrap();

        assert_eq!(seen, 2);
        assert_eq!(ctx.properties().get(SEEN_BY), Some(&vec!["a", "b"]));
    }

    #[tokio::test]
    async fn test_strategy_can_skip_callback() {
        let mut builder = ResiliencePipelineBuilder::<usize>::new();
        builder.add_strategy(|_, _: StampOptions| ShortCircuitStrategy, StampOptions("open"));
        let pipeline = builder.build().unwrap();

        let result = pipeline
            .run(|_| Box::pin(ready(Err(anyhow::anyhow!("must not run")))))
            .await
            .unwrap();

        assert_eq!(result, 0);
    }

    #[tokio::test]
    async fn test_next_reports_remaining_layers() {
        let mut builder = ResiliencePipelineBuilder::<usize>::new();
        for label in ["a", "b", "c"] {
            builder.add_strategy(|_, _: StampOptions| DepthStrategy, StampOptions(label));
        }
        let pipeline = builder.build().unwrap();

        let mut ctx = ExecutionContext::new(CancellationToken::new());
        pipeline
            .execute(|_| Box::pin(ready(Ok(1))), &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.properties().get(REMAINING), Some(&vec![2, 1, 0]));
    }

    #[test]
    fn test_debug_lists_strategies() {
        let mut builder = ResiliencePipelineBuilder::<usize>::named("orders");
        builder.add_strategy(|_, o: StampOptions| StampStrategy(o.0), StampOptions("a"));
        let pipeline = builder.build().unwrap();

        assert_eq!(
            format!("{pipeline:?}"),
            r#"ResiliencePipeline { name: Some("orders"), strategies: ["a"] }"#
        );
    }
}
