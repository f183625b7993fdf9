//! Pinecone backend implementation over the REST data plane API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PineconeConfig;
use crate::TRACING_TARGET;
use crate::error::{VectorError, VectorResult};
use crate::store::{SearchOptions, SearchResult, VectorData, VectorStoreBackend};

/// Most vectors sent in one upsert request.
const MAX_UPSERT_VECTORS: usize = 100;

/// Largest upsert body, kept below the 2 MiB request limit.
const MAX_UPSERT_BYTES: usize = 2 * 1024 * 1024 - 64 * 1024;

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [PineconeVector],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PineconeVector {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, PineconeVector>,
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, Value>,
    #[serde(default)]
    dimension: Option<usize>,
}

/// Pinecone backend implementation.
pub struct PineconeBackend {
    http: Client,
    base_url: String,
    config: PineconeConfig,
}

impl PineconeBackend {
    /// Creates a new Pinecone backend.
    pub async fn new(config: &PineconeConfig) -> VectorResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| VectorError::invalid_config("Pinecone API key is not a valid header"))?;
        headers.insert("Api-Key", api_key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| VectorError::connection(e.to_string()))?;

        let base_url = config.base_url();

        tracing::info!(
            target: TRACING_TARGET,
            environment = %config.environment,
            project_id = %config.project_id,
            index = %config.index,
            base_url = %base_url,
            "Pinecone backend initialized"
        );

        Ok(Self {
            http,
            base_url,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolves a collection name to a Pinecone namespace.
    ///
    /// An empty collection selects the configured namespace, and without
    /// one the index default namespace.
    fn namespace<'a>(&'a self, collection: &'a str) -> Option<&'a str> {
        if collection.is_empty() {
            self.config.namespace.as_deref().filter(|ns| !ns.is_empty())
        } else {
            Some(collection)
        }
    }

    async fn check(response: Response, action: &str) -> VectorResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!(
            target: TRACING_TARGET,
            status = %status.as_u16(),
            body = %body,
            "Pinecone API error"
        );

        let message = format!("Failed to {action}: {} - {body}", status.as_u16());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VectorError::authentication(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                VectorError::timeout(message)
            }
            _ => VectorError::backend(message),
        })
    }

    async fn index_stats(&self) -> VectorResult<IndexStats> {
        let response = self
            .http
            .post(self.url("/describe_index_stats"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = Self::check(response, "describe Pinecone index").await?;
        Ok(response.json().await?)
    }

    fn check_dimensions(&self, actual: usize) -> VectorResult<()> {
        match self.config.dimensions {
            Some(expected) if expected != actual => {
                Err(VectorError::dimension_mismatch(expected, actual))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStoreBackend for PineconeBackend {
    async fn create_collection(&self, name: &str, dimensions: usize) -> VectorResult<()> {
        // Namespaces are created implicitly on first upsert.
        let stats = self.index_stats().await?;
        if let Some(expected) = stats.dimension.filter(|d| *d != 0 && *d != dimensions) {
            return Err(VectorError::dimension_mismatch(expected, dimensions));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            namespace = ?self.namespace(name),
            dimensions = %dimensions,
            "Pinecone namespace ready"
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> VectorResult<()> {
        let request = DeleteRequest {
            ids: None,
            delete_all: true,
            namespace: self.namespace(name),
        };
        let response = self
            .http
            .post(self.url("/vectors/delete"))
            .json(&request)
            .send()
            .await?;
        Self::check(response, "clear Pinecone namespace").await?;

        tracing::info!(
            target: TRACING_TARGET,
            namespace = ?request.namespace,
            "Cleared Pinecone namespace"
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> VectorResult<bool> {
        let stats = self.index_stats().await?;
        Ok(match self.namespace(name) {
            Some(namespace) => stats.namespaces.contains_key(namespace),
            None => true,
        })
    }

    async fn upsert(&self, collection: &str, vectors: Vec<VectorData>) -> VectorResult<()> {
        if vectors.is_empty() {
            return Ok(());
        }
        for vector in &vectors {
            self.check_dimensions(vector.vector.len())?;
        }

        let count = vectors.len();
        let payload: Vec<PineconeVector> = vectors
            .into_iter()
            .map(|v| PineconeVector {
                id: v.id,
                values: v.vector,
                metadata: v.metadata,
            })
            .collect();

        let namespace = self.namespace(collection);
        let batches = upsert_batches(&payload)?;
        for batch in &batches {
            let request = UpsertRequest {
                vectors: batch,
                namespace,
            };
            let response = self
                .http
                .post(self.url("/vectors/upsert"))
                .json(&request)
                .send()
                .await?;
            Self::check(response, "add to Pinecone").await?;
        }

        tracing::debug!(
            target: TRACING_TARGET,
            namespace = ?namespace,
            count = %count,
            batches = %batches.len(),
            "Upserted vectors into Pinecone"
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
        self.check_dimensions(query.len())?;

        let namespace = match options.namespace.as_deref() {
            Some(ns) => Some(ns),
            None => self.namespace(collection),
        };
        let request = QueryRequest {
            vector: query,
            top_k: limit,
            include_metadata: true,
            include_values: options.include_vectors,
            filter: options.filter.as_ref().map(|f| f.to_pinecone()),
            namespace,
        };

        let response = self
            .http
            .post(self.url("/query"))
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response, "query Pinecone").await?;
        let body: QueryResponse = response.json().await?;

        let results: Vec<SearchResult> = body
            .matches
            .into_iter()
            .map(|m| SearchResult {
                id: m.id,
                score: m.score,
                vector: (options.include_vectors && !m.values.is_empty()).then_some(m.values),
                metadata: if options.include_metadata {
                    m.metadata
                } else {
                    HashMap::new()
                },
            })
            .collect();

        tracing::debug!(
            target: TRACING_TARGET,
            namespace = ?namespace,
            matches = %results.len(),
            "Pinecone query completed"
        );
        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: Vec<String>) -> VectorResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = DeleteRequest {
            ids: Some(&ids),
            delete_all: false,
            namespace: self.namespace(collection),
        };
        let response = self
            .http
            .post(self.url("/vectors/delete"))
            .json(&request)
            .send()
            .await?;
        Self::check(response, "delete from Pinecone").await?;
        Ok(())
    }

    async fn get(&self, collection: &str, ids: Vec<String>) -> VectorResult<Vec<VectorData>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        if let Some(namespace) = self.namespace(collection) {
            query.push(("namespace", namespace));
        }

        let response = self
            .http
            .get(self.url("/vectors/fetch"))
            .query(&query)
            .send()
            .await?;
        let response = Self::check(response, "fetch from Pinecone").await?;
        let body: FetchResponse = response.json().await?;

        // Keep the caller's ordering; ids Pinecone did not return are skipped.
        let mut fetched = body.vectors;
        Ok(ids
            .iter()
            .filter_map(|id| fetched.remove(id))
            .map(|v| VectorData {
                id: v.id,
                vector: v.values,
                metadata: v.metadata,
            })
            .collect())
    }
}

/// Splits vectors into upsert requests within the count and size limits.
fn upsert_batches(vectors: &[PineconeVector]) -> VectorResult<Vec<&[PineconeVector]>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes = 0;

    for (i, vector) in vectors.iter().enumerate() {
        // Separator comma included.
        let size = serde_json::to_vec(vector)?.len() + 1;
        let full = i - start == MAX_UPSERT_VECTORS || bytes + size > MAX_UPSERT_BYTES;
        if i > start && full {
            batches.push(&vectors[start..i]);
            start = i;
            bytes = 0;
        }
        bytes += size;
    }
    if start < vectors.len() {
        batches.push(&vectors[start..]);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::filter::MetadataFilter;

    #[test]
    fn query_request_uses_camel_case_and_eq_filter() {
        let request = QueryRequest {
            vector: vec![0.5, 0.5],
            top_k: 10,
            include_metadata: true,
            include_values: false,
            filter: Some(MetadataFilter::new().eq("sessionId", "s-1").to_pinecone()),
            namespace: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "vector": [0.5, 0.5],
                "topK": 10,
                "includeMetadata": true,
                "includeValues": false,
                "filter": { "sessionId": { "$eq": "s-1" } },
            })
        );
    }

    fn segment_vector(i: usize, dimensions: usize, text_len: usize) -> PineconeVector {
        PineconeVector {
            id: format!("doc-1##s-1##{i}"),
            values: vec![-0.012_345_678; dimensions],
            metadata: HashMap::from([
                ("text".to_string(), json!("x".repeat(text_len))),
                ("sessionId".to_string(), json!("s-1")),
            ]),
        }
    }

    #[test]
    fn large_upserts_are_split_within_limits() {
        let vectors: Vec<_> = (0..120).map(|i| segment_vector(i, 1536, 2000)).collect();
        let single = serde_json::to_vec(&UpsertRequest {
            vectors: &vectors,
            namespace: None,
        })
        .unwrap();
        assert!(single.len() > 2 * 1024 * 1024);

        let batches = upsert_batches(&vectors).unwrap();
        assert!(batches.len() > 1);
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 120);
        for batch in &batches {
            assert!(batch.len() <= MAX_UPSERT_VECTORS);
            let body = serde_json::to_vec(&UpsertRequest {
                vectors: batch,
                namespace: Some("codelab"),
            })
            .unwrap();
            assert!(body.len() < 2 * 1024 * 1024, "batch body is {} bytes", body.len());
        }
    }

    #[test]
    fn upserts_are_split_by_count() {
        let vectors: Vec<_> = (0..250).map(|i| segment_vector(i, 4, 10)).collect();
        let sizes: Vec<_> = upsert_batches(&vectors)
            .unwrap()
            .iter()
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let small = upsert_batches(&vectors[..3]).unwrap();
        assert_eq!(small.len(), 1);
        assert!(upsert_batches(&[]).unwrap().is_empty());
    }

    #[test]
    fn delete_all_request_omits_ids() {
        let request = DeleteRequest {
            ids: None,
            delete_all: true,
            namespace: Some("docs"),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "deleteAll": true, "namespace": "docs" })
        );
    }

    #[test]
    fn query_response_tolerates_missing_fields() {
        let body: QueryResponse = serde_json::from_value(json!({
            "matches": [
                { "id": "a", "score": 0.91, "metadata": { "text": "hello" } },
                { "id": "b", "score": 0.42 }
            ],
            "namespace": ""
        }))
        .unwrap();

        assert_eq!(body.matches.len(), 2);
        assert_eq!(body.matches[0].metadata["text"], json!("hello"));
        assert!(body.matches[1].metadata.is_empty());
    }

    #[tokio::test]
    async fn namespace_resolution() {
        let config = PineconeConfig::new("key", "env", "proj", "idx").with_namespace("default-ns");
        let backend = PineconeBackend::new(&config).await.unwrap();

        assert_eq!(backend.namespace(""), Some("default-ns"));
        assert_eq!(backend.namespace("docs"), Some("docs"));
    }

    #[tokio::test]
    async fn rejects_mismatched_dimensions_before_sending() {
        let config = PineconeConfig::new("key", "env", "proj", "idx").with_dimensions(3);
        let backend = PineconeBackend::new(&config).await.unwrap();

        let err = backend
            .upsert("", vec![VectorData::new("a", vec![1.0, 2.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
