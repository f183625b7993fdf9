//! Errors raised by vector store backends.

use thiserror::Error;

/// Result alias used throughout the vector store.
pub type VectorResult<T> = Result<T, VectorError>;

/// Failure of a vector store operation.
#[derive(Debug, Error)]
pub enum VectorError {
    /// The backend could not be reached.
    #[error("vector store unreachable: {0}")]
    Connection(String),

    /// The store configuration is incomplete or inconsistent.
    #[error("invalid vector store configuration: {0}")]
    InvalidConfig(String),

    /// The backend refused the API key.
    #[error("vector store rejected credentials: {0}")]
    Authentication(String),

    /// The backend did not answer in time.
    #[error("vector store request timed out: {0}")]
    Timeout(String),

    /// A vector does not have the dimensionality of the index.
    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The backend answered with an error.
    #[error("{0}")]
    Backend(String),

    /// A request or response body could not be (de)serialized.
    #[error("malformed vector store payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VectorError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        match err {
            err if err.is_timeout() => Self::timeout(err.to_string()),
            err if err.is_decode() => Self::backend(format!("undecodable response: {err}")),
            err => Self::connection(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(VectorError::connection("refused").is_retryable());
        assert!(VectorError::timeout("30s").is_retryable());
        assert!(!VectorError::backend("bad filter").is_retryable());
        assert!(!VectorError::dimension_mismatch(1536, 3).is_retryable());
    }

    #[test]
    fn backend_messages_are_verbatim() {
        let err = VectorError::backend("Failed to query Pinecone: 400 - bad");
        assert_eq!(err.to_string(), "Failed to query Pinecone: 400 - bad");
    }
}
