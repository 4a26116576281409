//! Error Types
//!
//! One enum covers the failure taxonomy of the generation pipeline:
//! input validation, upstream transport/API failures, JSON recovery
//! exhaustion and schema validation of recovered documents. Per-line stream
//! parse failures are never surfaced and have no variant.

use thiserror::Error;

/// Errors produced by the generation pipeline
#[derive(Debug, Error)]
pub enum StudioError {
    /// A required request field is missing or has the wrong shape.
    /// Raised before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The completion API answered with a non-success status
    #[error("completion API error: {status} - {body}")]
    Upstream {
        /// HTTP status code returned upstream
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// Connection, timeout or body read failure talking to the completion API
    #[error("completion API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The completion API answered 2xx but the payload was not a completion
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// Every JSON recovery strategy failed
    #[error("could not parse JSON from model output, preview: {preview}...")]
    Recovery {
        /// Leading characters of the model output
        preview: String,
    },

    /// The recovered document lacks fields the caller requires
    #[error("model output is incomplete: {0}")]
    Schema(String),
}

impl StudioError {
    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Whether the error was caused by the caller's input
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_carries_status_and_body() {
        let err = StudioError::Upstream {
            status: 402,
            body: "{\"error\":\"Insufficient Balance\"}".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("402"));
        assert!(message.contains("Insufficient Balance"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_classification() {
        assert!(StudioError::validation("title is required").is_validation());
        assert!(!StudioError::schema("chapters missing").is_validation());
    }
}
