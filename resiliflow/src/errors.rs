//! Error types for the resiliflow framework.
//!
//! Action failures travel through pipelines as [`anyhow::Error`] so that their
//! concrete type survives every strategy layer. The types here are the errors
//! the framework itself produces.

use std::time::Duration;
use thiserror::Error;

/// Error raised when an execution observes cooperative cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Execution cancelled{}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
pub struct Cancelled {
    /// The cancellation reason, if the token carried one.
    pub reason: Option<String>,
}

impl Cancelled {
    /// Creates a cancellation error with a reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    /// Creates a cancellation error without a reason.
    #[must_use]
    pub fn without_reason() -> Self {
        Self { reason: None }
    }
}

/// Error raised by the timeout strategy when the inner call exceeds its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Execution timed out after {}ms", .timeout.as_millis())]
pub struct TimeoutRejected {
    /// The deadline that was exceeded.
    pub timeout: Duration,
}

impl TimeoutRejected {
    /// Creates a new timeout rejection.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Error raised when the continue-on-error reporting callback panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("on_error callback panicked: {message}")]
pub struct OnErrorPanicked {
    /// The panic payload rendered as text.
    pub message: String,
}

/// Returns true if the error, or anything in its source chain, is a [`Cancelled`].
#[must_use]
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<Cancelled>())
}

/// Pipeline configuration errors.
///
/// These are fatal: they surface at startup or on first use of a pipeline
/// name and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineConfigError {
    /// A pipeline with this name is already registered.
    #[error("Pipeline '{name}' is already registered")]
    DuplicatePipeline {
        /// The pipeline name.
        name: String,
    },

    /// No pipeline is registered under this name.
    #[error("Pipeline '{name}' is not registered")]
    PipelineNotFound {
        /// The pipeline name.
        name: String,
    },

    /// A strategy's options failed validation.
    #[error("Invalid options for strategy '{strategy}'{}: {reason}", .pipeline.as_ref().map(|p| format!(" in pipeline '{p}'")).unwrap_or_default())]
    InvalidOptions {
        /// The pipeline being built, if named.
        pipeline: Option<String>,
        /// The strategy options name.
        strategy: String,
        /// Why validation failed.
        reason: String,
    },

    /// The pipeline configuration callback failed.
    #[error("Failed to build pipeline '{name}': {reason}")]
    BuildFailed {
        /// The pipeline name.
        name: String,
        /// The rendered configuration error.
        reason: String,
    },
}

impl PipelineConfigError {
    /// Creates a duplicate pipeline error.
    #[must_use]
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicatePipeline { name: name.into() }
    }

    /// Creates a pipeline not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::PipelineNotFound { name: name.into() }
    }

    /// Creates an invalid options error for an unnamed pipeline.
    #[must_use]
    pub fn invalid_options(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            pipeline: None,
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Creates a build failure from the error returned by a configure callback.
    #[must_use]
    pub fn build_failed(name: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::BuildFailed {
            name: name.into(),
            reason: format!("{error:#}"),
        }
    }

    /// Attaches the pipeline name to an options error.
    #[must_use]
    pub fn in_pipeline(self, name: Option<&str>) -> Self {
        match self {
            Self::InvalidOptions {
                pipeline: None,
                strategy,
                reason,
            } => Self::InvalidOptions {
                pipeline: name.map(str::to_string),
                strategy,
                reason,
            },
            other => other,
        }
    }

    /// Returns a stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicatePipeline { .. } => "PIPELINE-001-DUPLICATE",
            Self::PipelineNotFound { .. } => "PIPELINE-002-NOT_FOUND",
            Self::InvalidOptions { .. } => "PIPELINE-003-INVALID_OPTIONS",
            Self::BuildFailed { .. } => "PIPELINE-004-BUILD_FAILED",
        }
    }

    /// Returns a hint for fixing the error.
    #[must_use]
    pub fn fix_hint(&self) -> &'static str {
        match self {
            Self::DuplicatePipeline { .. } => {
                "Each pipeline name may be registered once. Rename one of the pipelines."
            }
            Self::PipelineNotFound { .. } => {
                "Register the pipeline during startup before any consumer refers to it. \
                 Check for typos in the pipeline name."
            }
            Self::InvalidOptions { .. } => {
                "Correct the strategy options; see the options type for valid ranges."
            }
            Self::BuildFailed { .. } => "Fix the error raised by the pipeline configure callback.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display() {
        assert_eq!(Cancelled::new("shutdown").to_string(), "Execution cancelled: shutdown");
        assert_eq!(Cancelled::without_reason().to_string(), "Execution cancelled");
    }

    #[test]
    fn test_is_cancellation_searches_chain() {
        let direct = anyhow::Error::new(Cancelled::new("stop"));
        assert!(is_cancellation(&direct));

        let wrapped = anyhow::Error::new(Cancelled::new("stop")).context("while handling order");
        assert!(is_cancellation(&wrapped));

        let other = anyhow::anyhow!("boom");
        assert!(!is_cancellation(&other));
    }

    #[test]
    fn test_timeout_display() {
        let err = TimeoutRejected::new(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Execution timed out after 250ms");
    }

    #[test]
    fn test_config_error_codes() {
        assert_eq!(PipelineConfigError::duplicate("a").code(), "PIPELINE-001-DUPLICATE");
        assert_eq!(PipelineConfigError::not_found("a").code(), "PIPELINE-002-NOT_FOUND");
        assert!(!PipelineConfigError::not_found("a").fix_hint().is_empty());
    }

    #[test]
    fn test_invalid_options_in_pipeline() {
        let err = PipelineConfigError::invalid_options("Retry", "max_retry_attempts must be >= 1")
            .in_pipeline(Some("orders"));

        assert_eq!(
            err.to_string(),
            "Invalid options for strategy 'Retry' in pipeline 'orders': max_retry_attempts must be >= 1"
        );
    }

    #[test]
    fn test_build_failed_renders_chain() {
        let source = anyhow::anyhow!("missing endpoint").context("loading settings");
        let err = PipelineConfigError::build_failed("orders", &source);
        assert_eq!(
            err.to_string(),
            "Failed to build pipeline 'orders': loading settings: missing endpoint"
        );
    }
}
