//! Pipeline building and execution.
//!
//! This module provides:
//! - The strategy composition protocol
//! - Pipeline builder with options validation
//! - Frozen pipelines that wrap a callback
//! - A registry of named pipelines
//! - Data-only pipeline declarations

mod builder;
mod chain;
mod declaration;
mod registry;
mod strategy;


pub use builder::ResiliencePipelineBuilder;
pub use chain::ResiliencePipeline;
pub use declaration::{declarations_from_json, PipelineDeclaration, StrategyDeclaration};
pub use registry::PipelineRegistry;
pub use strategy::{
    Callback, Next, Outcome, ResilienceStrategy, StrategyBuildContext, StrategyOptions,
};
