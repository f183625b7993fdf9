//! Cosine-similarity index held in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::TRACING_TARGET;
use crate::error::{VectorError, VectorResult};
use crate::store::{SearchOptions, SearchResult, VectorData, VectorStoreBackend};

#[derive(Debug, Default)]
struct Collection {
    dimensions: Option<usize>,
    vectors: HashMap<String, VectorData>,
}

impl Collection {
    fn check_dimensions(&mut self, actual: usize) -> VectorResult<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                Err(VectorError::dimension_mismatch(expected, actual))
            }
            Some(_) => Ok(()),
            None => {
                self.dimensions = Some(actual);
                Ok(())
            }
        }
    }
}

/// Process-local backend with the same filter semantics as Pinecone.
///
/// Collections are created implicitly on first upsert.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity of two vectors, 0.0 when either has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[async_trait]
impl VectorStoreBackend for MemoryBackend {
    async fn create_collection(&self, name: &str, dimensions: usize) -> VectorResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(name.to_string()).or_default();
        collection.check_dimensions(dimensions)
    }

    async fn delete_collection(&self, name: &str) -> VectorResult<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> VectorResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn upsert(&self, collection: &str, vectors: Vec<VectorData>) -> VectorResult<()> {
        let mut collections = self.collections.write().await;
        let entry = collections.entry(collection.to_string()).or_default();

        for vector in &vectors {
            entry.check_dimensions(vector.vector.len())?;
        }
        for vector in vectors {
            entry.vectors.insert(vector.id.clone(), vector);
        }

        tracing::trace!(
            target: TRACING_TARGET,
            collection = %collection,
            total = %entry.vectors.len(),
            "Upserted vectors into memory backend"
        );
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        options: SearchOptions,
    ) -> VectorResult<Vec<SearchResult>> {
        let collection = options.namespace.as_deref().unwrap_or(collection);
        let collections = self.collections.read().await;
        let Some(entry) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = entry
            .vectors
            .values()
            .filter(|v| {
                options
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(&v.metadata))
            })
            .map(|v| SearchResult {
                id: v.id.clone(),
                score: cosine_similarity(&query, &v.vector),
                vector: options.include_vectors.then(|| v.vector.clone()),
                metadata: if options.include_metadata {
                    v.metadata.clone()
                } else {
                    HashMap::new()
                },
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);
        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: Vec<String>) -> VectorResult<()> {
        if let Some(entry) = self.collections.write().await.get_mut(collection) {
            for id in &ids {
                entry.vectors.remove(id);
            }
        }
        Ok(())
    }

    async fn get(&self, collection: &str, ids: Vec<String>) -> VectorResult<Vec<VectorData>> {
        let collections = self.collections.read().await;
        let Some(entry) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| entry.vectors.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filter::MetadataFilter;

    fn tagged(id: &str, vector: Vec<f32>, session: &str, kind: &str) -> VectorData {
        VectorData::new(id, vector)
            .with_field("sessionId", json!(session))
            .with_field("type", json!(kind))
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_applies_equality_filter() {
        let backend = MemoryBackend::new();
        backend
            .upsert(
                "",
                vec![
                    tagged("a", vec![1.0, 0.0], "s-1", "method"),
                    tagged("b", vec![1.0, 0.1], "s-1", "class"),
                    tagged("c", vec![1.0, 0.0], "s-2", "method"),
                ],
            )
            .await
            .unwrap();

        let options = SearchOptions::new()
            .with_metadata()
            .with_filter(MetadataFilter::new().eq("sessionId", "s-1").eq("type", "method"));
        let hits = backend.search("", vec![1.0, 0.0], 10, options).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].metadata["type"], json!("method"));
    }

    #[tokio::test]
    async fn search_respects_limit_and_metadata_flag() {
        let backend = MemoryBackend::new();
        let vectors = (0..5)
            .map(|i| tagged(&format!("v{i}"), vec![1.0, i as f32], "s", "field"))
            .collect();
        backend.upsert("c", vectors).await.unwrap();

        let hits = backend
            .search("c", vec![1.0, 0.0], 2, SearchOptions::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "v0");
        assert!(hits[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_changes() {
        let backend = MemoryBackend::new();
        backend.create_collection("c", 3).await.unwrap();

        let err = backend
            .upsert("c", vec![VectorData::new("a", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn delete_and_get() {
        let backend = MemoryBackend::new();
        backend
            .upsert(
                "c",
                vec![
                    VectorData::new("a", vec![1.0, 0.0]),
                    VectorData::new("b", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        backend.delete("c", vec!["a".into()]).await.unwrap();
        let found = backend
            .get("c", vec!["a".into(), "b".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");

        assert!(backend.collection_exists("c").await.unwrap());
        backend.delete_collection("c").await.unwrap();
        assert!(!backend.collection_exists("c").await.unwrap());
    }
}
