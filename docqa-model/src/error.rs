//! Error types for the `docqa-model` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a text generation backend.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The backend was constructed or invoked with invalid settings.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The request could not be delivered (connection refused, DNS, TLS, ...).
    #[error("Request to {backend} failed: {message}")]
    Request {
        /// The backend that issued the request.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("{backend} API returned {status}: {message}")]
    Api {
        /// The backend that produced the error.
        backend: String,
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the response body.
        message: String,
    },

    /// No response arrived within the allotted time.
    #[error("Generation timed out after {}ms", after.as_millis())]
    Timeout {
        /// How long the caller waited.
        after: Duration,
    },

    /// The backend answered, but the body could not be interpreted.
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse {
        /// The backend that produced the response.
        backend: String,
        /// A description of what was wrong.
        message: String,
    },
}

impl ModelError {
    /// Whether this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout { .. })
    }
}

/// A convenience result type for generation operations.
pub type Result<T> = std::result::Result<T, ModelError>;
