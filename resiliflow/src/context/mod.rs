//! Execution context management.
//!
//! This module provides:
//! - The per-run execution context passed through every strategy
//! - A typed property bag keyed by statically-declared tokens
//! - A pool of reusable contexts with scoped release
//! - Message metadata supplied by the host

mod execution;
mod message;
mod pool;
mod properties;

pub use execution::{ExecutionContext, MESSAGE_CONTEXT_KEY};
pub use message::MessageContext;
pub use pool::{ContextPool, PooledContext};
pub use properties::{PropertyKey, ResilienceProperties};
