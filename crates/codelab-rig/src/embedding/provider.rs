//! Embedding provider backed by the OpenAI embeddings API.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::provider::{AiService, ProviderConfig};
use crate::{Error, Result};

/// Tracing target for embedding calls.
const TRACING_TARGET: &str = "codelab_rig::embedding";

/// Most inputs accepted by one embeddings request.
const MAX_EMBEDDING_BATCH: usize = 2048;

/// Dimensions of the mock embedding space.
#[cfg(any(test, feature = "mock"))]
const MOCK_DIMENSIONS: usize = 128;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Turns text into vectors.
///
/// This is a cheaply cloneable wrapper around an `Arc<EmbeddingService>`.
#[derive(Clone)]
pub struct EmbeddingProvider(Arc<EmbeddingService>);

pub(crate) enum EmbeddingService {
    OpenAi {
        http: Client,
        base_url: String,
        api_key: String,
        model_name: String,
    },
    #[cfg(any(test, feature = "mock"))]
    Mock { dimensions: usize },
}

impl EmbeddingProvider {
    /// Creates an OpenAI embedding provider.
    pub fn openai(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self(Arc::new(EmbeddingService::OpenAi {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
        }))
    }

    /// Creates an OpenAI embedding provider from the provider configuration.
    ///
    /// Fails if no OpenAI key is configured.
    pub fn from_config(http: Client, config: &ProviderConfig) -> Result<Self> {
        let api_key = config.api_key(AiService::OpenAi).ok_or_else(|| {
            Error::config("OpenAI API key is required for embeddings")
        })?;
        Ok(Self::openai(
            http,
            config.base_url(AiService::OpenAi),
            api_key,
            config.embedding_model.trim(),
        ))
    }

    /// Creates a deterministic bag-of-words embedder.
    ///
    /// Texts sharing words get similar vectors, which is enough for
    /// nearest-neighbour tests without network access.
    #[cfg(any(test, feature = "mock"))]
    pub fn mock() -> Self {
        Self(Arc::new(EmbeddingService::Mock {
            dimensions: MOCK_DIMENSIONS,
        }))
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.0.as_ref() {
            EmbeddingService::OpenAi { model_name, .. } => model_name,
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Mock { .. } => "mock",
        }
    }

    /// Returns the vector dimensions, when known up front.
    pub fn dimensions(&self) -> Option<usize> {
        match self.0.as_ref() {
            EmbeddingService::OpenAi { model_name, .. } => match model_name.as_str() {
                "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
                "text-embedding-3-large" => Some(3072),
                _ => None,
            },
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Mock { dimensions } => Some(*dimensions),
        }
    }

    /// Embeds a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_all(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no embedding"))
    }

    /// Embeds several texts, preserving order.
    ///
    /// Large inputs are sent in requests of at most 2048 texts.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBEDDING_BATCH) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.0.as_ref() {
            EmbeddingService::OpenAi {
                http,
                base_url,
                api_key,
                model_name,
            } => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    model = %model_name,
                    texts = %texts.len(),
                    "Requesting embeddings"
                );

                let response = http
                    .post(format!("{base_url}/embeddings"))
                    .bearer_auth(api_key)
                    .json(&EmbeddingRequest {
                        model: model_name,
                        input: texts,
                    })
                    .send()
                    .await
                    .map_err(Error::embedding)?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Failed to get embeddings: {} - {body}",
                        status.as_u16()
                    )));
                }

                let mut body: EmbeddingResponse =
                    response.json().await.map_err(Error::embedding)?;
                if body.data.len() != texts.len() {
                    return Err(Error::embedding(format!(
                        "expected {} embeddings, got {}",
                        texts.len(),
                        body.data.len()
                    )));
                }
                body.data.sort_by_key(|d| d.index);
                Ok(body.data.into_iter().map(|d| d.embedding).collect())
            }
            #[cfg(any(test, feature = "mock"))]
            EmbeddingService::Mock { dimensions } => Ok(texts
                .iter()
                .map(|text| bag_of_words(text, *dimensions))
                .collect()),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
fn bag_of_words(text: &str, dimensions: usize) -> Vec<f32> {
    use std::hash::{DefaultHasher, Hash, Hasher};

    let mut vector = vec![0.0f32; dimensions];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        let slot = (hasher.finish() % dimensions as u64) as usize;
        vector[slot] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model", &self.model_name())
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use codelab_vector::memory::cosine_similarity;

    use super::*;

    #[tokio::test]
    async fn mock_is_deterministic_and_normalized() {
        let provider = EmbeddingProvider::mock();
        let a = provider.embed("list all methods").await.unwrap();
        let b = provider.embed("list all methods").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn mock_similarity_tracks_shared_words() {
        let provider = EmbeddingProvider::mock();
        let query = provider.embed("show methods").await.unwrap();
        let close = provider.embed("show methods list methods").await.unwrap();
        let far = provider.embed("package organization").await.unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn large_inputs_keep_order_across_batches() {
        let provider = EmbeddingProvider::mock();
        let texts: Vec<String> = (0..MAX_EMBEDDING_BATCH + 5)
            .map(|i| format!("segment{i}"))
            .collect();

        let vectors = provider.embed_all(&texts).await.unwrap();
        assert_eq!(vectors.len(), texts.len());
        let last = provider.embed(&texts[texts.len() - 1]).await.unwrap();
        assert_eq!(vectors[texts.len() - 1], last);
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let provider = EmbeddingProvider::mock();
        assert!(provider.embed_all(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn openai_requires_a_key() {
        let err = EmbeddingProvider::from_config(Client::new(), &ProviderConfig::default())
            .unwrap_err();
        assert!(err.is_service_error());

        let config = ProviderConfig::default().with_openai_api_key("sk-1");
        let provider = EmbeddingProvider::from_config(Client::new(), &config).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dimensions(), Some(1536));
    }
}
