//! Error types for codelab-rig.

use std::fmt;

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during rig operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider error (API call failed, rate limited, etc.)
    #[error("{message}")]
    Provider { provider: String, message: String },

    /// Session error (not found, invalid, etc.)
    #[error("{0}")]
    Session(String),

    /// No chat service matches the requested name.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector retrieval error.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Document parsing or validation error.
    #[error("{0}")]
    Document(String),

    /// Configuration error.
    #[error("{0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Vector store error.
    #[error(transparent)]
    Vector(#[from] codelab_vector::VectorError),
}

impl Error {
    /// Creates a provider error.
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a session error.
    pub fn session(message: impl fmt::Display) -> Self {
        Self::Session(message.to_string())
    }

    /// Creates a service unavailable error.
    pub fn service_unavailable(message: impl fmt::Display) -> Self {
        Self::ServiceUnavailable(message.to_string())
    }

    /// Creates an embedding error.
    pub fn embedding(message: impl fmt::Display) -> Self {
        Self::Embedding(message.to_string())
    }

    /// Creates a retrieval error.
    pub fn retrieval(message: impl fmt::Display) -> Self {
        Self::Retrieval(message.to_string())
    }

    /// Creates a document error.
    pub fn document(message: impl fmt::Display) -> Self {
        Self::Document(message.to_string())
    }

    /// Creates a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Returns true if this error is raised by an AI service call or its
    /// setup, including resolving the session, as opposed to invalid input
    /// or storage failures.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. }
                | Self::Session(_)
                | Self::ServiceUnavailable(_)
                | Self::Config(_)
        )
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { .. } => true,
            Self::Vector(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_message_only() {
        let err = Error::provider("openai", "Failed to analyze code: timeout");
        assert_eq!(err.to_string(), "Failed to analyze code: timeout");
        assert!(err.is_service_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn session_error_is_a_service_error() {
        let err = Error::session("Session not found: abc");
        assert!(err.is_service_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn document_error_is_not_a_service_error() {
        let err = Error::document("Only .java files are supported");
        assert!(!err.is_service_error());
    }
}
