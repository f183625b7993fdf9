//! Document RAG (Retrieval-Augmented Generation) module.
//!
//! Uploaded Java sources and PDFs are split into segments, embedded and
//! stored per session. Questions are classified by intent, answered from
//! the closest segments of the asking session and kept in a transcript.
//!
//! # Modules
//!
//! - [`java`] - Structural parsing of Java sources into code elements
//! - [`pdf`] - PDF text extraction and chunking
//! - [`indexer`] - Embedding and storage of segments
//! - [`intent`] - Embedding-based question classification
//!
//! # Security
//!
//! Every document search is filtered by the `sessionId` of the request.
//!
//! # Example
//!
//! ```ignore
//! use codelab_rig::rag::{DocumentChatRequest, RagService};
//!
//! let rag = RagService::new(store, embedder, manager, config);
//! rag.initialize().await;
//!
//! let upload = rag.processing().process("Cart.java", &bytes, "s-1").await;
//! let answer = rag.chat().chat(&DocumentChatRequest::new("List methods", "s-1")).await;
//! ```

mod chat;
mod config;
pub mod indexer;
pub mod intent;
pub mod java;
pub mod pdf;
mod processing;
mod segment;

use codelab_vector::VectorStore;

pub use self::chat::{ChatMessage, DocumentChatRequest, DocumentChatResponse, DocumentChatService};
pub use self::config::RagConfig;
pub use self::indexer::EmbeddingStore;
pub use self::intent::{IntentDetection, IntentDetectionService, SearchIntent};
pub use self::processing::{
    DocumentInfo, DocumentProcessingService, DocumentType, DocumentUpload,
    UNSUPPORTED_UPLOAD_MESSAGE,
};
pub use self::segment::{ScoredSegment, TextSegment};
use crate::embedding::EmbeddingProvider;
use crate::provider::AiServiceManager;

/// Tracing target for RAG operations.
const TRACING_TARGET: &str = "codelab_rig::rag";

/// High-level document RAG service.
///
/// Encapsulates:
/// - Document upload and indexing via [`DocumentProcessingService`]
/// - Intent classification via [`IntentDetectionService`]
/// - Question answering via [`DocumentChatService`]
///
/// All parts share one [`EmbeddingStore`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RagService {
    store: EmbeddingStore,
    processing: DocumentProcessingService,
    intents: IntentDetectionService,
    chat: DocumentChatService,
}

impl RagService {
    /// Wires the document services around one vector collection.
    pub fn new(
        store: VectorStore,
        embedder: EmbeddingProvider,
        manager: AiServiceManager,
        config: RagConfig,
    ) -> Self {
        let store = EmbeddingStore::new(store, embedder, config.collection.clone());
        let intents = IntentDetectionService::new(
            store.clone(),
            config.intent_top_k,
            config.intent_min_score,
        );
        let chat = DocumentChatService::new(manager, store.clone(), intents.clone(), &config);
        let processing = DocumentProcessingService::new(store.clone(), config);

        tracing::info!(
            target: TRACING_TARGET,
            backend = %store.vector_store().backend_name(),
            embedding_model = %store.embedder().model_name(),
            "RAG service initialized"
        );

        Self {
            store,
            processing,
            intents,
            chat,
        }
    }

    /// Stores the intent embeddings. Returns the number stored.
    pub async fn initialize(&self) -> usize {
        self.intents.initialize().await
    }

    /// Returns the segment store.
    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Returns the upload service.
    pub fn processing(&self) -> &DocumentProcessingService {
        &self.processing
    }

    /// Returns the intent detection service.
    pub fn intents(&self) -> &IntentDetectionService {
        &self.intents
    }

    /// Returns the chat service.
    pub fn chat(&self) -> &DocumentChatService {
        &self.chat
    }
}
