//! Embedding-based classification of document questions.
//!
//! Each [`SearchIntent`] is stored once as the embedding of its joined
//! example phrases. A question is classified by its nearest stored intent.

use std::collections::BTreeMap;
use std::fmt;

use codelab_vector::MetadataFilter;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use super::indexer::EmbeddingStore;
use super::segment::TextSegment;
use crate::Result;

/// Tracing target for intent detection.
const TRACING_TARGET: &str = "codelab_rig::rag::intent";

/// Segment type of stored intent embeddings.
const INTENT_TYPE: &str = "intent";

/// Category of a document question, mapped to the segment type it targets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchIntent {
    Methods,
    Classes,
    Fields,
    Constructors,
    Packages,
    Imports,
    General,
}

impl SearchIntent {
    /// Returns the segment `type` this intent restricts searches to.
    pub fn type_filter(self) -> Option<&'static str> {
        match self {
            Self::Methods => Some("method"),
            Self::Classes => Some("class"),
            Self::Fields => Some("field"),
            Self::Constructors => Some("constructor"),
            Self::Packages => Some("package"),
            Self::Imports => Some("imports"),
            Self::General => None,
        }
    }

    /// Returns the phrases representing this intent.
    pub fn examples(self) -> &'static [&'static str] {
        match self {
            Self::Methods => &[
                "methods",
                "functions",
                "function list",
                "show methods",
                "list methods",
                "what methods",
                "method names",
                "all methods",
                "get methods",
                "methods in class",
                "available methods",
                "public methods",
            ],
            Self::Classes => &[
                "classes",
                "class names",
                "show classes",
                "list classes",
                "what classes",
                "all classes",
                "get classes",
                "available classes",
                "class structure",
                "class definition",
                "class hierarchy",
            ],
            Self::Fields => &[
                "fields",
                "variables",
                "show fields",
                "list fields",
                "what fields",
                "all fields",
                "get fields",
                "available fields",
                "field names",
                "field types",
                "instance variables",
                "class variables",
            ],
            Self::Constructors => &[
                "constructors",
                "show constructors",
                "list constructors",
                "what constructors",
                "all constructors",
                "get constructors",
                "constructor parameters",
                "constructor names",
                "initialization",
            ],
            Self::Packages => &[
                "packages",
                "package names",
                "show packages",
                "list packages",
                "what packages",
                "all packages",
                "get packages",
                "package structure",
                "package organization",
                "namespace",
            ],
            Self::Imports => &[
                "imports",
                "import statements",
                "show imports",
                "list imports",
                "what imports",
                "all imports",
                "get imports",
                "imported classes",
                "dependencies",
                "external classes",
            ],
            Self::General => &[
                "explain",
                "describe",
                "what is",
                "how does",
                "tell me about",
                "overview",
                "summary",
                "information",
                "details",
                "help",
            ],
        }
    }

    /// Returns the name used in metadata and logs, e.g. `METHODS`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// An intent with the similarity that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntentDetection {
    /// Detected intent.
    pub intent: SearchIntent,
    /// Similarity of the question to the intent, 0.0 for the fallback.
    pub confidence: f32,
}

impl IntentDetection {
    /// The fallback returned when nothing matched.
    pub fn general() -> Self {
        Self {
            intent: SearchIntent::General,
            confidence: 0.0,
        }
    }
}

impl fmt::Display for IntentDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4})", self.intent, self.confidence)
    }
}

/// Classifies questions against stored intent embeddings.
#[derive(Debug, Clone)]
pub struct IntentDetectionService {
    store: EmbeddingStore,
    top_k: usize,
    min_score: f32,
}

impl IntentDetectionService {
    /// Creates the service. `top_k` candidates are considered per question
    /// and only those scoring at least `min_score` may win.
    pub fn new(store: EmbeddingStore, top_k: usize, min_score: f32) -> Self {
        Self {
            store,
            top_k,
            min_score,
        }
    }

    /// Embeds and stores every intent.
    ///
    /// Failures are logged and skipped so a missing embedding backend does
    /// not prevent startup; detection then falls back to
    /// [`SearchIntent::General`]. Returns the number of stored intents.
    pub async fn initialize(&self) -> usize {
        tracing::info!(target: TRACING_TARGET, "Initializing intent embeddings");

        let mut stored = 0;
        for intent in SearchIntent::iter() {
            match self.store_intent(intent).await {
                Ok(()) => {
                    stored += 1;
                    tracing::info!(
                        target: TRACING_TARGET,
                        intent = %intent,
                        examples = %intent.examples().len(),
                        "Stored intent embedding"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        intent = %intent,
                        error = %err,
                        "Failed to store intent embedding"
                    );
                }
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            stored = %stored,
            "Intent embeddings initialization completed"
        );
        stored
    }

    /// Detects the intent of a question.
    ///
    /// Returns [`IntentDetection::general`] when no intent scores above the
    /// threshold or the lookup fails.
    pub async fn detect(&self, query: &str) -> IntentDetection {
        let matches = match self.matches(query, self.top_k, self.min_score).await {
            Ok(matches) => matches,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Error detecting search intent"
                );
                return IntentDetection::general();
            }
        };

        for candidate in matches.iter().take(3) {
            tracing::debug!(
                target: TRACING_TARGET,
                candidate = %candidate,
                "Intent match"
            );
        }

        let Some(best) = matches.into_iter().next() else {
            tracing::info!(
                target: TRACING_TARGET,
                "No intent matches found, using GENERAL intent"
            );
            return IntentDetection::general();
        };

        tracing::info!(
            target: TRACING_TARGET,
            intent = %best.intent,
            confidence = %best.confidence,
            "Intent detection completed"
        );
        best
    }

    /// Returns up to `n` intents ranked by similarity, without a threshold.
    pub async fn top_intents(&self, query: &str, n: usize) -> Vec<IntentDetection> {
        self.matches(query, n, 0.0).await.unwrap_or_else(|err| {
            tracing::error!(
                target: TRACING_TARGET,
                error = %err,
                "Error getting top intents"
            );
            vec![IntentDetection::general()]
        })
    }

    /// Returns true if intent embeddings can be found in the store.
    pub async fn is_initialized(&self) -> bool {
        match self.matches("test", 1, 0.0).await {
            Ok(matches) => !matches.is_empty(),
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Could not verify intent embeddings"
                );
                false
            }
        }
    }

    /// Returns the example phrases of every intent.
    pub fn intent_examples(&self) -> BTreeMap<SearchIntent, &'static [&'static str]> {
        SearchIntent::iter()
            .map(|intent| (intent, intent.examples()))
            .collect()
    }

    async fn store_intent(&self, intent: SearchIntent) -> Result<()> {
        let text = intent.examples().join(" ");
        let embedding = self.store.embedder().embed(&text).await?;
        let segment = TextSegment::new(text)
            .with("type", INTENT_TYPE)
            .with("intent", intent.as_str())
            .with("pineconeFilter", intent.type_filter().unwrap_or("general"))
            .with("isIntentEmbedding", true);

        // One vector per intent, overwritten on re-initialization.
        let id = format!("{INTENT_TYPE}##{}", intent.as_str());
        self.store.add_embedded(id, embedding, &segment).await
    }

    async fn matches(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<IntentDetection>> {
        let embedding = self.store.embedder().embed(query).await?;
        let filter = MetadataFilter::new().eq("type", INTENT_TYPE);
        let found = self
            .store
            .find_relevant(embedding, top_k, min_score, filter)
            .await?;

        Ok(found
            .into_iter()
            .filter_map(|scored| {
                let intent = scored.segment.get("intent")?.parse().ok()?;
                Some(IntentDetection {
                    intent,
                    confidence: scored.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use codelab_vector::VectorStore;

    use super::*;
    use crate::embedding::EmbeddingProvider;

    fn service() -> IntentDetectionService {
        let store = EmbeddingStore::new(VectorStore::memory(), EmbeddingProvider::mock(), "");
        IntentDetectionService::new(store, 5, 0.3)
    }

    #[test]
    fn intents_map_to_segment_types() {
        assert_eq!(SearchIntent::Methods.type_filter(), Some("method"));
        assert_eq!(SearchIntent::Imports.type_filter(), Some("imports"));
        assert_eq!(SearchIntent::General.type_filter(), None);
        assert_eq!(SearchIntent::Constructors.to_string(), "CONSTRUCTORS");
        assert_eq!("FIELDS".parse::<SearchIntent>().unwrap(), SearchIntent::Fields);
    }

    #[tokio::test]
    async fn uninitialized_service_falls_back_to_general() {
        let service = service();
        assert!(!service.is_initialized().await);
        assert_eq!(service.detect("list methods").await, IntentDetection::general());
    }

    #[tokio::test]
    async fn detects_nearest_intent() {
        let service = service();
        assert_eq!(service.initialize().await, 7);
        assert!(service.is_initialized().await);

        let detection = service.detect("methods").await;
        assert_eq!(detection.intent, SearchIntent::Methods);
        assert!(detection.confidence >= 0.3);
    }

    #[tokio::test]
    async fn initialization_is_idempotent() {
        let service = service();
        service.initialize().await;
        service.initialize().await;

        let ranked = service.top_intents("methods", 20).await;
        assert_eq!(ranked.len(), 7);
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn examples_cover_every_intent() {
        let examples = service().intent_examples();
        assert_eq!(examples.len(), 7);
        assert!(examples[&SearchIntent::General].contains(&"overview"));
    }
}
