//! Host-facing execution strategies.
//!
//! A message host hands every received message to a
//! [`MessageHandlerExecutionStrategy`]. The [`DirectExecutionStrategy`] calls
//! the handler once; the [`ResilienceExecutionStrategy`] runs it through a
//! named pipeline from a [`PipelineRegistry`](crate::pipeline::PipelineRegistry).

mod adapter;

pub use adapter::{
    message_action, DirectExecutionStrategy, MessageAction, MessageHandlerExecutionStrategy,
    ResilienceExecutionStrategy,
};
