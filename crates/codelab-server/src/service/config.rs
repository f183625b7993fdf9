//! Service state configuration.

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use codelab_rig::provider::ProviderConfig;
use codelab_rig::rag::RagConfig;
use codelab_vector::{PineconeConfig, VectorStoreConfig};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration of the [`ServiceState`].
///
/// [`ServiceState`]: crate::service::ServiceState
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// AI provider keys, models and endpoints.
    #[cfg_attr(feature = "config", command(flatten))]
    pub provider: ProviderConfig,

    /// Vector store holding document segments and intents.
    #[cfg_attr(feature = "config", command(flatten))]
    pub vector: VectorConfig,

    /// Document processing and retrieval options.
    #[cfg_attr(feature = "config", command(flatten))]
    pub rag: RagConfig,
}

impl ServiceConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.rag.validate()?;
        self.vector.store_config()?;
        Ok(())
    }
}

/// Vector store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Pinecone managed index.
    Pinecone,
    /// Process-local index, lost on restart.
    #[default]
    Memory,
}

/// Vector store configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct VectorConfig {
    /// Backend storing the embeddings.
    #[cfg_attr(
        feature = "config",
        arg(long = "vector-backend", env = "VECTOR_BACKEND", value_enum, default_value = "memory")
    )]
    pub backend: VectorBackend,

    /// Pinecone API key.
    #[serde(skip_serializing)]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PINECONE_API_KEY", hide_env_values = true)
    )]
    pub pinecone_api_key: Option<String>,

    /// Pinecone environment, e.g. `us-east-1-aws`.
    #[cfg_attr(feature = "config", arg(long, env = "PINECONE_ENVIRONMENT"))]
    pub pinecone_environment: Option<String>,

    /// Pinecone project identifier.
    #[cfg_attr(feature = "config", arg(long, env = "PINECONE_PROJECT_ID"))]
    pub pinecone_project_id: Option<String>,

    /// Pinecone index name.
    #[cfg_attr(feature = "config", arg(long, env = "PINECONE_INDEX"))]
    pub pinecone_index: Option<String>,

    /// Index host overriding the one derived from the environment.
    #[cfg_attr(feature = "config", arg(long, env = "PINECONE_HOST"))]
    pub pinecone_host: Option<String>,

    /// Namespace within the index.
    #[cfg_attr(feature = "config", arg(long, env = "PINECONE_NAMESPACE"))]
    pub pinecone_namespace: Option<String>,
}

impl VectorConfig {
    /// Builds and validates the vector store configuration.
    pub fn store_config(&self) -> Result<VectorStoreConfig> {
        match self.backend {
            VectorBackend::Memory => Ok(VectorStoreConfig::Memory),
            VectorBackend::Pinecone => {
                let required = |value: &Option<String>, name: &str| {
                    value
                        .as_deref()
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_owned)
                        .ok_or_else(|| Error::config(format!("{name} is required for Pinecone")))
                };

                let mut config = PineconeConfig::new(
                    required(&self.pinecone_api_key, "PINECONE_API_KEY")?,
                    required(&self.pinecone_environment, "PINECONE_ENVIRONMENT")?,
                    required(&self.pinecone_project_id, "PINECONE_PROJECT_ID")?,
                    required(&self.pinecone_index, "PINECONE_INDEX")?,
                );
                if let Some(host) = self.pinecone_host.as_deref().filter(|h| !h.is_empty()) {
                    config = config.with_host(host);
                }
                if let Some(namespace) = self.pinecone_namespace.as_deref().filter(|n| !n.is_empty())
                {
                    config = config.with_namespace(namespace);
                }

                config.validate()?;
                Ok(VectorStoreConfig::Pinecone(config))
            }
        }
    }
}

impl std::fmt::Debug for VectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorConfig")
            .field("backend", &self.backend)
            .field("pinecone_api_key", &self.pinecone_api_key.as_ref().map(|_| "***"))
            .field("pinecone_environment", &self.pinecone_environment)
            .field("pinecone_project_id", &self.pinecone_project_id)
            .field("pinecone_index", &self.pinecone_index)
            .field("pinecone_host", &self.pinecone_host)
            .field("pinecone_namespace", &self.pinecone_namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;

    use super::*;

    fn pinecone() -> VectorConfig {
        VectorConfig {
            backend: VectorBackend::Pinecone,
            pinecone_api_key: Some("pc-key".to_owned()),
            pinecone_environment: Some("us-east-1-aws".to_owned()),
            pinecone_project_id: Some("abc123".to_owned()),
            pinecone_index: Some("codelab".to_owned()),
            pinecone_host: None,
            pinecone_namespace: Some("docs".to_owned()),
        }
    }

    #[test]
    fn memory_is_the_default_backend() {
        let config = ServiceConfig::default();
        assert_eq!(config.vector.backend, VectorBackend::Memory);
        assert_eq!(config.vector.store_config().unwrap(), VectorStoreConfig::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn pinecone_requires_every_coordinate() {
        let config = VectorConfig {
            pinecone_index: None,
            ..pinecone()
        };
        let err = config.store_config().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains("PINECONE_INDEX"));
    }

    #[test]
    fn pinecone_config_carries_namespace() {
        let VectorStoreConfig::Pinecone(config) = pinecone().store_config().unwrap() else {
            panic!("expected a Pinecone configuration");
        };
        assert_eq!(config.index, "codelab");
        assert_eq!(config.namespace.as_deref(), Some("docs"));
    }

    #[test]
    fn debug_hides_the_api_key() {
        let debug = format!("{:?}", pinecone());
        assert!(!debug.contains("pc-key"));
    }
}
