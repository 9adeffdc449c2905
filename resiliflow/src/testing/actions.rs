//! Scripted actions for testing.

use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::execution::{message_action, MessageAction};

/// The error returned by a failing [`ScriptedAction`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Scripted failure on attempt {attempt}")]
pub struct ScriptedFailure {
    /// The 1-based invocation that failed.
    pub attempt: usize,
}

/// An action that fails a fixed number of times and counts its invocations.
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct ScriptedAction {
    failures: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAction {
    fn with_failures(failures: Option<usize>) -> Self {
        Self {
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An action that always succeeds.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_failures(Some(0))
    }

    /// An action that fails `n` times and then succeeds.
    #[must_use]
    pub fn failing_times(n: usize) -> Self {
        Self::with_failures(Some(n))
    }

    /// An action that never succeeds.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::with_failures(None)
    }

    /// Runs the action once.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptedFailure`] while the scripted failures last.
    pub fn invoke(&self) -> anyhow::Result<()> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failures {
            Some(failures) if attempt > failures => Ok(()),
            _ => Err(ScriptedFailure { attempt }.into()),
        }
    }

    /// Returns the number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wraps the action for a message handler execution strategy.
    #[must_use]
    pub fn message_action(&self) -> MessageAction {
        let action = self.clone();
        message_action(move |_| Box::pin(ready(action.invoke())))
    }
}
