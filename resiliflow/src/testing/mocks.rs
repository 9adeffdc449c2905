//! Mock strategies for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::pipeline::{Next, Outcome, ResilienceStrategy, StrategyBuildContext, StrategyOptions};

/// A shared, ordered log of events.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a snapshot of the entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// Options for [`RecordingStrategy`].
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    label: String,
}

impl StrategyOptions for RecordingOptions {
    fn name(&self) -> &str {
        &self.label
    }
}

/// A strategy that records `label:enter` and `label:exit` around the rest of the pipeline.
#[derive(Debug)]
pub struct RecordingStrategy {
    label: String,
    log: CallLog,
}

impl RecordingStrategy {
    /// Creates options with the given label.
    #[must_use]
    pub fn options(label: impl Into<String>) -> RecordingOptions {
        RecordingOptions { label: label.into() }
    }

    /// Returns a factory writing to `log`, for use with `add_strategy`.
    pub fn factory(
        log: CallLog,
    ) -> impl FnOnce(&StrategyBuildContext, RecordingOptions) -> Self + Send + 'static {
        move |_: &StrategyBuildContext, options: RecordingOptions| Self {
            label: options.label,
            log,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> ResilienceStrategy<T> for RecordingStrategy {
    async fn execute(&self, next: Next<'_, T>, ctx: &mut ExecutionContext) -> Outcome<T> {
        self.log.record(format!("{}:enter", self.label));
        let outcome = next.run(ctx).await;
        self.log.record(format!("{}:exit", self.label));
        outcome
    }
}
