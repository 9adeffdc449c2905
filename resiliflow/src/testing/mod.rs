//! Testing utilities for resilience pipelines.
//!
//! This module provides:
//! - A recording strategy and a shared call log for asserting composition order
//! - Scripted actions that fail a fixed number of times

mod actions;
mod mocks;

pub use actions::{ScriptedAction, ScriptedFailure};
pub use mocks::{CallLog, RecordingOptions, RecordingStrategy};
