//! Metadata about the message currently being handled.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata about the message being processed.
///
/// The host supplies one per received message. It is stored in the execution
/// context under [`MESSAGE_CONTEXT_KEY`](super::MESSAGE_CONTEXT_KEY) so that
/// strategies (notably the continue-on-error reporting callback) can read it.
/// `MessageContext::default()` is the empty placeholder used when none was stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContext {
    /// The message type as declared by the producer.
    pub message_type: String,
    /// The message id, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// The correlation id, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// The causation id, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    /// Remaining transport headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// The decoded message payload, if the host chose to expose it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl MessageContext {
    /// Creates a new message context for a message type.
    #[must_use]
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            ..Default::default()
        }
    }

    /// Sets the message id.
    #[must_use]
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Sets the causation id.
    #[must_use]
    pub fn with_causation_id(mut self, id: impl Into<String>) -> Self {
        self.causation_id = Some(id.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns true if this is the empty placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self == &Self::default()
    }
}
