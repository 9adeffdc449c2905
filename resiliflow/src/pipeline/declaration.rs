//! Data-only pipeline declarations.
//!
//! Declarations let pipelines be described in configuration files. Callbacks
//! and predicates are not data, so declared strategies use their defaults for
//! those.

use super::ResiliencePipelineBuilder;
use crate::strategies::{ContinueOnErrorOptions, RetryOptions, TimeoutOptions};
use serde::{Deserialize, Serialize};

/// One strategy in a declared pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyDeclaration {
    /// Absorb handled errors after reporting them.
    ContinueOnError(ContinueOnErrorOptions),
    /// Re-run the rest of the pipeline on handled errors.
    Retry(RetryOptions),
    /// Bound the rest of the pipeline by a deadline.
    Timeout(TimeoutOptions),
}

impl StrategyDeclaration {
    /// Appends the declared strategy to a builder.
    pub fn apply<T: Default + Send + 'static>(&self, builder: &mut ResiliencePipelineBuilder<T>) {
        match self {
            Self::ContinueOnError(options) => {
                builder.add_continue_on_error(options.clone());
            }
            Self::Retry(options) => {
                builder.add_retry(options.clone());
            }
            Self::Timeout(options) => {
                builder.add_timeout(options.clone());
            }
        }
    }
}

/// A named pipeline and its strategies, outermost first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDeclaration {
    /// The pipeline name.
    pub name: String,
    /// Strategies in composition order.
    #[serde(default)]
    pub strategies: Vec<StrategyDeclaration>,
}

impl PipelineDeclaration {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyDeclaration) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Parses a single declaration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the JSON does not describe a pipeline.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Appends every declared strategy to a builder.
    pub fn apply<T: Default + Send + 'static>(&self, builder: &mut ResiliencePipelineBuilder<T>) {
        for strategy in &self.strategies {
            strategy.apply(builder);
        }
    }
}

/// Parses a JSON array of declarations.
///
/// # Errors
///
/// Returns the parse error if the JSON is not an array of pipelines.
pub fn declarations_from_json(json: &str) -> serde_json::Result<Vec<PipelineDeclaration>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{BackoffStrategy, JitterStrategy};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_declaration_with_defaults() {
        let declaration = PipelineDeclaration::from_json(
            r#"{
                "name": "orders",
                "strategies": [
                    {"kind": "continue_on_error"},
                    {"kind": "retry", "max_retry_attempts": 5, "backoff": "Linear"},
                    {"kind": "timeout"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(declaration.name, "orders");
        assert_eq!(declaration.strategies.len(), 3);

        let StrategyDeclaration::Retry(retry) = &declaration.strategies[1] else {
            panic!("expected retry, got {:?}", declaration.strategies[1]);
        };
        assert_eq!(retry.max_retry_attempts, 5);
        assert_eq!(retry.base_delay_ms, 1000);
        assert_eq!(retry.backoff, BackoffStrategy::Linear);
        assert_eq!(retry.jitter, JitterStrategy::None);

        let StrategyDeclaration::Timeout(timeout) = &declaration.strategies[2] else {
            panic!("expected timeout, got {:?}", declaration.strategies[2]);
        };
        assert_eq!(timeout.timeout_ms, 30_000);
    }

    #[test]
    fn test_missing_strategies_is_empty() {
        let declaration = PipelineDeclaration::from_json(r#"{"name": "bare"}"#).unwrap();
        assert!(declaration.strategies.is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = PipelineDeclaration::from_json(r#"{"name": "x", "strategies": [{"kind": "bulkhead"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("bulkhead"));
    }

    #[test]
    fn test_apply_preserves_order() {
        let declaration = PipelineDeclaration::new("orders")
            .with_strategy(StrategyDeclaration::ContinueOnError(ContinueOnErrorOptions::new()))
            .with_strategy(StrategyDeclaration::Timeout(TimeoutOptions::new().with_timeout_ms(50)));

        let mut builder = ResiliencePipelineBuilder::<()>::named("orders");
        declaration.apply(&mut builder);
        let pipeline = builder.build().unwrap();

        assert_eq!(
            pipeline.strategy_names(),
            &["ContinueOnError".to_string(), "Timeout".to_string()]
        );
    }

    #[test]
    fn test_declaration_serializes_kind_tag() {
        let declaration = PipelineDeclaration::new("payments")
            .with_strategy(StrategyDeclaration::Timeout(TimeoutOptions::new().with_timeout_ms(250)));

        let json = serde_json::to_value(&declaration).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "payments",
                "strategies": [{"kind": "timeout", "name": "Timeout", "timeout_ms": 250}]
            })
        );
    }
}
