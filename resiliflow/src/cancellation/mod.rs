//! Cooperative cancellation.
//!
//! A single [`CancellationToken`] flows from the host into the execution
//! context, is observed by every strategy, and is handed to the action.

mod token;

pub use token::{CancelCallback, CancellationToken};
