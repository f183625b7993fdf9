//! Pinecone configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// Pinecone configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PineconeConfig {
    /// Pinecone API key.
    pub api_key: String,
    /// Environment (e.g., "us-east-1-aws").
    pub environment: String,
    /// Project identifier used in the index host name.
    pub project_id: String,
    /// Index name.
    pub index: String,
    /// Full index host, overriding the one derived from the fields above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Namespace used when a call names no collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Vector dimensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Request timeout.
    #[serde(with = "timeout_secs", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl PineconeConfig {
    /// Creates a new Pinecone configuration.
    pub fn new(
        api_key: impl Into<String>,
        environment: impl Into<String>,
        project_id: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            environment: environment.into(),
            project_id: project_id.into(),
            index: index.into(),
            host: None,
            namespace: None,
            dimensions: None,
            timeout: default_timeout(),
        }
    }

    /// Sets an explicit index host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the vector dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the data plane base URL without a trailing slash.
    ///
    /// Pinecone serves each index from
    /// `https://{index}-{project}.svc.{environment}.pinecone.io`.
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => format!(
                "https://{}-{}.svc.{}.pinecone.io",
                self.index, self.project_id, self.environment
            ),
        }
    }

    /// Checks that the configuration can address an index.
    pub fn validate(&self) -> VectorResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(VectorError::invalid_config("Pinecone API key is required"));
        }
        if self.host.is_none()
            && [&self.index, &self.project_id, &self.environment]
                .iter()
                .any(|v| v.trim().is_empty())
        {
            return Err(VectorError::invalid_config(
                "Pinecone index, project id and environment are required without an explicit host",
            ));
        }
        if self.dimensions == Some(0) {
            return Err(VectorError::invalid_config("dimensions must be positive"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("environment", &self.environment)
            .field("project_id", &self.project_id)
            .field("index", &self.index)
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_index_host() {
        let config = PineconeConfig::new("key", "aped-4627-b74a", "9dn22sq", "code-index");
        assert_eq!(
            config.base_url(),
            "https://code-index-9dn22sq.svc.aped-4627-b74a.pinecone.io"
        );
    }

    #[test]
    fn host_override_wins() {
        let config = PineconeConfig::new("key", "", "", "").with_host("localhost:5080/");
        assert_eq!(config.base_url(), "https://localhost:5080");
        assert!(config.validate().is_ok());

        let config = PineconeConfig::new("key", "", "", "").with_host("http://127.0.0.1:5080");
        assert_eq!(config.base_url(), "http://127.0.0.1:5080");
    }

    #[test]
    fn validation_rejects_missing_fields() {
        assert!(PineconeConfig::new("", "env", "proj", "idx").validate().is_err());
        assert!(PineconeConfig::new("key", "", "proj", "idx").validate().is_err());
        assert!(PineconeConfig::new("key", "env", "proj", "idx").validate().is_ok());
    }

    #[test]
    fn debug_hides_api_key() {
        let config = PineconeConfig::new("secret-key", "env", "proj", "idx");
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
