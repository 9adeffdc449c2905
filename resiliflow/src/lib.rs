//! # Resiliflow
//!
//! Named resilience pipelines for message handler execution.
//!
//! Resiliflow wraps each message handler invocation in a configurable chain of
//! strategies:
//!
//! - **Composable strategies**: Retry, timeout, and continue-on-error layers
//!   that wrap the rest of the pipeline
//! - **Named pipelines**: Built once at startup, resolved by name at run time
//! - **Pooled contexts**: Per-run execution contexts with typed properties
//! - **Cooperative cancellation**: One token flows from the host to the handler
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resiliflow::prelude::*;
//!
//! let mut registry = PipelineRegistry::new();
//! registry.register("orders", |builder| {
//!     builder
//!         .continue_on_error()
//!         .add_retry(RetryOptions::new().with_max_retry_attempts(3));
//! })?;
//!
//! let strategy = ResilienceExecutionStrategy::new("orders", Arc::new(registry));
//! strategy.execute(action, message, token).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod errors;
pub mod execution;
pub mod pipeline;
pub mod strategies;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{
        ContextPool, ExecutionContext, MessageContext, PropertyKey, ResilienceProperties,
        MESSAGE_CONTEXT_KEY,
    };
    pub use crate::errors::{
        is_cancellation, Cancelled, OnErrorPanicked, PipelineConfigError, TimeoutRejected,
    };
    pub use crate::execution::{
        message_action, DirectExecutionStrategy, MessageAction, MessageHandlerExecutionStrategy,
        ResilienceExecutionStrategy,
    };
    pub use crate::pipeline::{
        Next, Outcome, PipelineDeclaration, PipelineRegistry, ResiliencePipeline,
        ResiliencePipelineBuilder, ResilienceStrategy, StrategyOptions,
    };
    pub use crate::strategies::{
        BackoffStrategy, ContinueOnErrorOptions, JitterStrategy, RetryOptions, TimeoutOptions,
    };
}
