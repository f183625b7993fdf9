//! Embedding and storage of document segments.

use codelab_vector::{MetadataFilter, SearchOptions, VectorData, VectorStore};
use serde_json::Value;
use uuid::Uuid;

use super::segment::{ScoredSegment, TextSegment};
use crate::embedding::EmbeddingProvider;
use crate::{Error, Result};

/// Tracing target for segment indexing.
const TRACING_TARGET: &str = "codelab_rig::rag::indexer";

/// Metadata key holding the segment text in the vector store.
const TEXT_KEY: &str = "text";

/// Vector store collection of embedded text segments.
///
/// Cheap to clone; all clones share the store and the embedding client.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    store: VectorStore,
    embedder: EmbeddingProvider,
    collection: String,
}

impl EmbeddingStore {
    /// Creates a store writing to `collection`.
    pub fn new(
        store: VectorStore,
        embedder: EmbeddingProvider,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    /// Returns the embedding provider.
    pub fn embedder(&self) -> &EmbeddingProvider {
        &self.embedder
    }

    /// Returns the underlying vector store.
    pub fn vector_store(&self) -> &VectorStore {
        &self.store
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embeds and stores segments, returning the generated ids.
    ///
    /// Ids have the form `{documentId}##{sessionId}##{uuid}`.
    pub async fn add_segments(&self, segments: &[TextSegment]) -> Result<Vec<String>> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let embeddings = self.embedder.embed_all(&texts).await?;
        if embeddings.len() != segments.len() {
            return Err(Error::embedding(format!(
                "embedding count mismatch: expected {}, got {}",
                segments.len(),
                embeddings.len()
            )));
        }

        let mut ids = Vec::with_capacity(segments.len());
        let vectors: Vec<VectorData> = segments
            .iter()
            .zip(embeddings)
            .map(|(segment, embedding)| {
                let id = format!(
                    "{}##{}##{}",
                    segment.get_or("documentId", "null"),
                    segment.get_or("sessionId", "null"),
                    Uuid::new_v4()
                );
                ids.push(id.clone());
                self.to_vector(id, embedding, segment)
            })
            .collect();

        self.upsert(vectors).await?;
        tracing::info!(
            target: TRACING_TARGET,
            collection = %self.collection,
            segments = %ids.len(),
            "Stored segments"
        );
        Ok(ids)
    }

    /// Stores a single, already embedded segment under `id`.
    pub async fn add_embedded(
        &self,
        id: impl Into<String>,
        embedding: Vec<f32>,
        segment: &TextSegment,
    ) -> Result<()> {
        let vector = self.to_vector(id.into(), embedding, segment);
        self.upsert(vec![vector]).await
    }

    /// Finds the segments closest to `embedding` among those matching `filter`.
    ///
    /// Results are sorted by descending score.
    pub async fn find_relevant(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        min_score: f32,
        filter: MetadataFilter,
    ) -> Result<Vec<ScoredSegment>> {
        let mut options = SearchOptions::new().with_metadata().with_min_score(min_score);
        if !filter.is_empty() {
            options = options.with_filter(filter);
        }

        let results = self
            .store
            .search_with_options(&self.collection, embedding, top_k, options)
            .await
            .map_err(|err| Error::retrieval(format!("Failed to query vector store: {err}")))?;

        Ok(results
            .into_iter()
            .map(|result| {
                let text = result.metadata_str(TEXT_KEY).unwrap_or_default();
                let mut segment = TextSegment::new(text);
                for (key, value) in &result.metadata {
                    if key != TEXT_KEY {
                        segment.metadata.insert(key.clone(), value_to_string(value));
                    }
                }
                ScoredSegment {
                    segment,
                    score: result.score,
                }
            })
            .collect())
    }

    fn to_vector(&self, id: String, embedding: Vec<f32>, segment: &TextSegment) -> VectorData {
        let metadata = segment
            .metadata
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())));
        VectorData::new(id, embedding)
            .with_metadata(metadata)
            .with_field(TEXT_KEY, Value::String(segment.text.clone()))
    }

    async fn upsert(&self, vectors: Vec<VectorData>) -> Result<()> {
        self.store
            .upsert(&self.collection, vectors)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET,
                    collection = %self.collection,
                    error = %err,
                    "Failed to store segments"
                );
            })?;
        Ok(())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EmbeddingStore {
        EmbeddingStore::new(VectorStore::memory(), EmbeddingProvider::mock(), "")
    }

    fn segment(text: &str, session: &str, kind: &str) -> TextSegment {
        TextSegment::new(text)
            .with("documentId", "doc-1")
            .with("sessionId", session)
            .with("type", kind)
    }

    #[tokio::test]
    async fn ids_encode_document_and_session() {
        let ids = store()
            .add_segments(&[segment("class Cart", "s-1", "class")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids[0].starts_with("doc-1##s-1##"));
    }

    #[tokio::test]
    async fn search_is_scoped_by_filter() {
        let store = store();
        store
            .add_segments(&[
                segment("public void add item to cart", "s-1", "method"),
                segment("public class Cart holds items", "s-1", "class"),
                segment("public void add item to cart", "s-2", "method"),
            ])
            .await
            .unwrap();

        let query = store.embedder().embed("add item").await.unwrap();
        let filter = MetadataFilter::new().eq("sessionId", "s-1").eq("type", "method");
        let found = store.find_relevant(query, 10, 0.0, filter).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].segment.text, "public void add item to cart");
        assert_eq!(found[0].segment.get("sessionId"), Some("s-1"));
        assert!(found[0].segment.get(TEXT_KEY).is_none());
    }

    #[tokio::test]
    async fn empty_input_stores_nothing() {
        assert!(store().add_segments(&[]).await.unwrap().is_empty());
    }
}
