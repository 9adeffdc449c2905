//! The per-invocation execution context shared by every strategy in a run.

use super::{MessageContext, PropertyKey, ResilienceProperties};
use crate::cancellation::CancellationToken;
use uuid::Uuid;

/// Well-known key under which the adapter stores the current [`MessageContext`].
pub const MESSAGE_CONTEXT_KEY: PropertyKey<MessageContext> =
    PropertyKey::new("MessageExecutionContextKey");

/// Carrier of cancellation state and typed properties for one pipeline run.
///
/// Contexts are normally lent out by a [`ContextPool`](super::ContextPool) and
/// returned when the run completes. Strategies may read and add properties and
/// may swap the cancellation token for the duration of an inner call.
#[derive(Debug)]
pub struct ExecutionContext {
    cancellation_token: CancellationToken,
    properties: ResilienceProperties,
    continue_on_captured_context: bool,
    operation_key: Option<String>,
    execution_id: Uuid,
}

impl ExecutionContext {
    /// Creates a standalone context bound to a cancellation token.
    #[must_use]
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            properties: ResilienceProperties::new(),
            continue_on_captured_context: false,
            operation_key: None,
            execution_id: Uuid::new_v4(),
        }
    }

    /// Sets the operation key.
    #[must_use]
    pub fn with_operation_key(mut self, key: impl Into<String>) -> Self {
        self.operation_key = Some(key.into());
        self
    }

    /// Sets whether continuations should resume on the originating executor.
    #[must_use]
    pub fn with_continue_on_captured_context(mut self, value: bool) -> Self {
        self.continue_on_captured_context = value;
        self
    }

    /// Returns the active cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Replaces the active cancellation token, returning the previous one.
    ///
    /// Strategies that substitute a token for an inner call must restore the
    /// previous token before returning.
    pub fn replace_cancellation_token(&mut self, token: CancellationToken) -> CancellationToken {
        std::mem::replace(&mut self.cancellation_token, token)
    }

    /// Returns whether the active token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Returns the property bag.
    #[must_use]
    pub fn properties(&self) -> &ResilienceProperties {
        &self.properties
    }

    /// Returns the property bag for mutation.
    pub fn properties_mut(&mut self) -> &mut ResilienceProperties {
        &mut self.properties
    }

    /// Returns the stored message context, if any.
    #[must_use]
    pub fn message_context(&self) -> Option<&MessageContext> {
        self.properties.get(MESSAGE_CONTEXT_KEY)
    }

    /// Returns whether continuations should resume on the originating executor.
    #[must_use]
    pub fn continue_on_captured_context(&self) -> bool {
        self.continue_on_captured_context
    }

    /// Returns the operation key, if set.
    #[must_use]
    pub fn operation_key(&self) -> Option<&str> {
        self.operation_key.as_deref()
    }

    /// Sets the operation key.
    pub fn set_operation_key(&mut self, key: Option<String>) {
        self.operation_key = key;
    }

    /// Returns the id assigned to this execution.
    #[must_use]
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Prepares a recycled context for a new execution.
    pub(super) fn initialize(&mut self, cancellation_token: CancellationToken) {
        self.cancellation_token = cancellation_token;
        self.execution_id = Uuid::new_v4();
    }

    /// Clears per-execution state before the context is retained for reuse.
    pub(super) fn reset(&mut self) {
        self.properties.clear();
        self.cancellation_token = CancellationToken::new();
        self.continue_on_captured_context = false;
        self.operation_key = None;
    }
}
