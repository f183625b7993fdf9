//! Vector store trait and facade.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::config::VectorStoreConfig;
use crate::error::VectorResult;
use crate::filter::MetadataFilter;
use crate::memory::MemoryBackend;
use crate::pinecone::PineconeBackend;

/// Vector data to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorData {
    /// Unique identifier for the vector.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Optional metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VectorData {
    /// Creates a new vector data with an ID and embedding.
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: HashMap::new(),
        }
    }

    /// Replaces the metadata of the vector.
    pub fn with_metadata(
        mut self,
        metadata: impl IntoIterator<Item = (impl Into<String>, serde_json::Value)>,
    ) -> Self {
        self.metadata = metadata.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Adds a single metadata field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Search result from a vector query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Vector ID.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// The vector (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Associated metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SearchResult {
    /// Returns a metadata value rendered as text.
    ///
    /// Strings are returned verbatim, other JSON values use their JSON form.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Include vectors in results.
    pub include_vectors: bool,
    /// Include metadata in results.
    pub include_metadata: bool,
    /// Metadata equality filter.
    pub filter: Option<MetadataFilter>,
    /// Namespace/partition override.
    pub namespace: Option<String>,
    /// Results scoring below this value are dropped.
    pub min_score: Option<f32>,
}

impl SearchOptions {
    /// Creates default search options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include vectors in results.
    pub fn with_vectors(mut self) -> Self {
        self.include_vectors = true;
        self
    }

    /// Include metadata in results.
    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }

    /// Set a metadata filter. Empty filters are ignored.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = (!filter.is_empty()).then_some(filter);
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the minimum accepted score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// Trait for vector store backends.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Creates or ensures a collection exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> VectorResult<()>;

    /// Deletes a collection.
    async fn delete_collection(&self, name: &str) -> VectorResult<()>;

    /// Checks if a collection exists.
    async fn collection_exists(&self, name: &str) -> VectorResult<bool>;

    /// Upserts vectors into a collection.
    async fn upsert(&self, collection: &str, vectors: Vec<VectorData>) -> VectorResult<()>;

    /// Searches for similar vectors, best match first.
    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        options: SearchOptions,
    ) -> VectorResult<Vec<SearchResult>>;

    /// Deletes vectors by their IDs.
    async fn delete(&self, collection: &str, ids: Vec<String>) -> VectorResult<()>;

    /// Gets vectors by their IDs.
    async fn get(&self, collection: &str, ids: Vec<String>) -> VectorResult<Vec<VectorData>>;
}

/// Unified vector store that wraps backend implementations.
///
/// This is a cheaply cloneable handle.
#[derive(Clone)]
pub struct VectorStore {
    backend_name: &'static str,
    backend: Arc<dyn VectorStoreBackend>,
}

impl VectorStore {
    /// Creates a new vector store from configuration.
    pub async fn new(config: VectorStoreConfig) -> VectorResult<Self> {
        let backend: Arc<dyn VectorStoreBackend> = match &config {
            VectorStoreConfig::Pinecone(cfg) => Arc::new(PineconeBackend::new(cfg).await?),
            VectorStoreConfig::Memory => Arc::new(MemoryBackend::new()),
        };

        tracing::info!(
            target: TRACING_TARGET,
            backend = %config.backend_name(),
            "Vector store initialized"
        );

        Ok(Self {
            backend_name: config.backend_name(),
            backend,
        })
    }

    /// Creates a store backed by an in-process index.
    pub fn memory() -> Self {
        Self {
            backend_name: "memory",
            backend: Arc::new(MemoryBackend::new()),
        }
    }

    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Creates or ensures a collection exists.
    pub async fn create_collection(&self, name: &str, dimensions: usize) -> VectorResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %name,
            dimensions = %dimensions,
            "Creating collection"
        );
        self.backend.create_collection(name, dimensions).await
    }

    /// Deletes a collection.
    pub async fn delete_collection(&self, name: &str) -> VectorResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %name,
            "Deleting collection"
        );
        self.backend.delete_collection(name).await
    }

    /// Checks if a collection exists.
    pub async fn collection_exists(&self, name: &str) -> VectorResult<bool> {
        self.backend.collection_exists(name).await
    }

    /// Upserts vectors into a collection.
    pub async fn upsert(&self, collection: &str, vectors: Vec<VectorData>) -> VectorResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            count = %vectors.len(),
            "Upserting vectors"
        );
        self.backend.upsert(collection, vectors).await
    }

    /// Searches for similar vectors.
    pub async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
    ) -> VectorResult<Vec<SearchResult>> {
        self.search_with_options(collection, query, limit, SearchOptions::default())
            .await
    }

    /// Searches for similar vectors with options.
    ///
    /// Results are ordered by descending score and never contain entries
    /// below [`SearchOptions::min_score`].
    pub async fn search_with_options(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        options: SearchOptions,
    ) -> VectorResult<Vec<SearchResult>> {
        let min_score = options.min_score;
        let filter = options.filter.clone();

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            limit = %limit,
            filter = ?filter,
            "Searching vectors"
        );

        let mut results = self.backend.search(collection, query, limit, options).await?;
        if let Some(min_score) = min_score {
            results.retain(|result| result.score >= min_score);
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            matches = %results.len(),
            min_score = ?min_score,
            "Search completed"
        );

        Ok(results)
    }

    /// Deletes vectors by their IDs.
    pub async fn delete(&self, collection: &str, ids: Vec<String>) -> VectorResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            count = %ids.len(),
            "Deleting vectors"
        );
        self.backend.delete(collection, ids).await
    }

    /// Gets vectors by their IDs.
    pub async fn get(&self, collection: &str, ids: Vec<String>) -> VectorResult<Vec<VectorData>> {
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %collection,
            count = %ids.len(),
            "Getting vectors"
        );
        self.backend.get(collection, ids).await
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("backend", &self.backend_name)
            .finish()
    }
}
