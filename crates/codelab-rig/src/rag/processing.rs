//! Upload processing: parsing, segmentation and indexing of documents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::indexer::EmbeddingStore;
use super::java::{CodeElement, ElementKind, parse_java};
use super::pdf::{chunk_text, extract_text};
use super::segment::TextSegment;
use super::RagConfig;
use crate::{Error, Result};

/// Tracing target for document processing.
const TRACING_TARGET: &str = "codelab_rig::rag::processing";

/// Message returned for uploads that are neither a Java file nor a PDF
/// within the size limits.
pub const UNSUPPORTED_UPLOAD_MESSAGE: &str =
    "Only Java source files (.java) are supported unless 100 KB. Please upload a valid .java file.";

const JAVA_SUCCESS_MESSAGE: &str =
    "Java file uploaded successfully! You can now ask questions about your code.";
const JAVA_EMPTY_MESSAGE: &str =
    "Could not parse Java file. The file may be empty or contain invalid Java code.";
const PDF_SUCCESS_MESSAGE: &str =
    "PDF file uploaded successfully! You can now ask questions about your document.";
const PDF_EMPTY_MESSAGE: &str =
    "Could not extract text from PDF file. The file may be empty, scanned or encrypted.";

/// Kind of an uploaded document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentType {
    /// Java source file.
    Java,
    /// PDF document.
    Pdf,
}

impl DocumentType {
    /// Detects the document type from the file name and size, or `None` if
    /// the upload is not accepted.
    pub fn detect(file_name: &str, size: usize, config: &RagConfig) -> Option<Self> {
        let name = file_name.to_lowercase();
        if name.ends_with(".java") && (1..=config.max_java_bytes).contains(&size) {
            Some(Self::Java)
        } else if name.ends_with(".pdf") && (1..=config.max_pdf_bytes).contains(&size) {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Java => "Java source code file",
            Self::Pdf => "PDF document",
        }
    }
}

/// Outcome of an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    /// Whether the document was indexed.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Identifier of the stored document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Name of the uploaded file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Detected document type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    /// Upload size in bytes.
    pub file_size: usize,
    /// Number of indexed segments.
    pub segments_processed: usize,
    /// Time the upload was processed.
    pub uploaded_at: Timestamp,
    /// Processing statistics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl DocumentUpload {
    /// Creates a failed upload outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            document_id: None,
            file_name: None,
            document_type: None,
            file_size: 0,
            segments_processed: 0,
            uploaded_at: Timestamp::now(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A document held in the upload registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub document_id: String,
    pub file_name: String,
    pub document_type: DocumentType,
    pub description: String,
    pub file_size: usize,
    pub total_segments: usize,
    pub processed_segments: usize,
    /// Short summary of the indexed content.
    pub content: String,
    pub session_id: String,
    pub uploaded_at: Timestamp,
}

/// Turns uploads into indexed segments and remembers what was uploaded.
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone)]
pub struct DocumentProcessingService {
    store: EmbeddingStore,
    config: RagConfig,
    documents: Arc<RwLock<HashMap<String, DocumentInfo>>>,
}

impl DocumentProcessingService {
    /// Creates the service.
    pub fn new(store: EmbeddingStore, config: RagConfig) -> Self {
        Self {
            store,
            config,
            documents: Arc::default(),
        }
    }

    /// Returns the RAG configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Processes an upload according to its detected type.
    pub async fn process(
        &self,
        file_name: &str,
        bytes: &[u8],
        session_id: &str,
    ) -> DocumentUpload {
        match DocumentType::detect(file_name, bytes.len(), &self.config) {
            Some(DocumentType::Java) => self.process_java(file_name, bytes, session_id).await,
            Some(DocumentType::Pdf) => self.process_pdf(file_name, bytes, session_id).await,
            None => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    file_name = %file_name,
                    size = %bytes.len(),
                    "Unsupported upload rejected"
                );
                DocumentUpload::failure(UNSUPPORTED_UPLOAD_MESSAGE)
            }
        }
    }

    /// Parses a Java file into code element segments and indexes them.
    pub async fn process_java(
        &self,
        file_name: &str,
        bytes: &[u8],
        session_id: &str,
    ) -> DocumentUpload {
        if DocumentType::detect(file_name, bytes.len(), &self.config) != Some(DocumentType::Java) {
            return DocumentUpload::failure(UNSUPPORTED_UPLOAD_MESSAGE);
        }

        let document_id = Uuid::new_v4().to_string();
        let source = String::from_utf8_lossy(bytes);
        let elements = parse_java(&source);
        tracing::info!(
            target: TRACING_TARGET,
            file_name = %file_name,
            elements = %elements.len(),
            "Java file parsing completed"
        );

        if elements.is_empty() {
            return DocumentUpload::failure(JAVA_EMPTY_MESSAGE);
        }

        let segments: Vec<TextSegment> = elements
            .iter()
            .enumerate()
            .map(|(index, element)| code_segment(element, &document_id, session_id, index + 1))
            .collect();

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "codeLines".to_owned(),
            json!(elements.iter().map(CodeElement::line_count).sum::<usize>()),
        );
        metadata.insert(
            "classes".to_owned(),
            json!(count_kind(&elements, ElementKind::Class)),
        );
        metadata.insert(
            "methods".to_owned(),
            json!(count_kind(&elements, ElementKind::Method)),
        );

        let summary = format!("Java code with {} semantic segments", segments.len());
        self.finish(
            DocumentType::Java,
            document_id,
            file_name,
            bytes.len(),
            session_id,
            segments,
            metadata,
            summary,
        )
        .await
        .unwrap_or_else(|err| {
            tracing::error!(
                target: TRACING_TARGET,
                file_name = %file_name,
                error = %err,
                "Error processing Java file"
            );
            DocumentUpload::failure(format!("Error processing Java file: {err}"))
        })
    }

    /// Extracts and chunks the text of a PDF and indexes the chunks.
    pub async fn process_pdf(
        &self,
        file_name: &str,
        bytes: &[u8],
        session_id: &str,
    ) -> DocumentUpload {
        if DocumentType::detect(file_name, bytes.len(), &self.config) != Some(DocumentType::Pdf) {
            return DocumentUpload::failure(UNSUPPORTED_UPLOAD_MESSAGE);
        }

        let result: Result<DocumentUpload> = async {
            let text = extract_text(bytes)?;
            if text.trim().is_empty() {
                return Ok(DocumentUpload::failure(PDF_EMPTY_MESSAGE));
            }

            let document_id = Uuid::new_v4().to_string();
            let chunks = chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap)?;
            let pages = chunks.last().map_or(0, |chunk| chunk.page);
            let segments: Vec<TextSegment> = chunks
                .into_iter()
                .map(|chunk| {
                    base_segment(chunk.text, &document_id, session_id, chunk.index + 1)
                        .with("type", "chunk")
                        .with("name", format!("chunk{}", chunk.index + 1))
                        .with("class", file_name)
                        .with("startOffset", chunk.start_offset)
                        .with("endOffset", chunk.end_offset)
                        .with("page", chunk.page)
                        .with("contentType", "pdf_text")
                })
                .collect();

            let mut metadata = BTreeMap::new();
            metadata.insert("characters".to_owned(), json!(text.chars().count()));
            metadata.insert("pages".to_owned(), json!(pages));

            let summary = format!("PDF text with {} chunks", segments.len());
            self.finish(
                DocumentType::Pdf,
                document_id,
                file_name,
                bytes.len(),
                session_id,
                segments,
                metadata,
                summary,
            )
            .await
        }
        .await;

        result.unwrap_or_else(|err| {
            tracing::error!(
                target: TRACING_TARGET,
                file_name = %file_name,
                error = %err,
                "Error processing PDF file"
            );
            DocumentUpload::failure(format!("Error processing PDF file: {err}"))
        })
    }

    /// Returns an uploaded document.
    pub async fn document(&self, document_id: &str) -> Option<DocumentInfo> {
        self.documents.read().await.get(document_id).cloned()
    }

    /// Returns the documents uploaded in a session, oldest first.
    pub async fn documents_for_session(&self, session_id: &str) -> Vec<DocumentInfo> {
        let mut documents: Vec<DocumentInfo> = self
            .documents
            .read()
            .await
            .values()
            .filter(|info| info.session_id == session_id)
            .cloned()
            .collect();
        documents.sort_by_key(|info| info.uploaded_at);
        documents
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        document_type: DocumentType,
        document_id: String,
        file_name: &str,
        file_size: usize,
        session_id: &str,
        segments: Vec<TextSegment>,
        mut metadata: BTreeMap<String, Value>,
        summary: String,
    ) -> Result<DocumentUpload> {
        if segments.is_empty() {
            return Err(Error::document("no segments to index"));
        }
        self.store.add_segments(&segments).await?;

        let count = segments.len();
        let uploaded_at = Timestamp::now();
        let info = DocumentInfo {
            document_id: document_id.clone(),
            file_name: file_name.to_owned(),
            document_type,
            description: document_type.description().to_owned(),
            file_size,
            total_segments: count,
            processed_segments: count,
            content: summary,
            session_id: session_id.to_owned(),
            uploaded_at,
        };
        self.documents
            .write()
            .await
            .insert(document_id.clone(), info);

        metadata.insert("totalSegments".to_owned(), json!(count));
        metadata.insert("processedSegments".to_owned(), json!(count));
        metadata.insert("documentType".to_owned(), json!(document_type));
        metadata.insert(
            "description".to_owned(),
            json!(document_type.description()),
        );
        metadata.insert(
            "vectorStore".to_owned(),
            json!(self.store.vector_store().backend_name()),
        );
        metadata.insert("sessionId".to_owned(), json!(session_id));

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %document_id,
            session_id = %session_id,
            file_name = %file_name,
            document_type = %document_type,
            segments = %count,
            "Document processed successfully"
        );

        Ok(DocumentUpload {
            success: true,
            message: match document_type {
                DocumentType::Java => JAVA_SUCCESS_MESSAGE,
                DocumentType::Pdf => PDF_SUCCESS_MESSAGE,
            }
            .to_owned(),
            document_id: Some(document_id),
            file_name: Some(file_name.to_owned()),
            document_type: Some(document_type),
            file_size,
            segments_processed: count,
            uploaded_at,
            metadata,
        })
    }
}

fn base_segment(text: String, document_id: &str, session_id: &str, index: usize) -> TextSegment {
    TextSegment::new(text)
        .with("documentId", document_id)
        .with("sessionId", session_id)
        .with("chunkIndex", index)
        .with("processingTimestamp", Timestamp::now().as_millisecond())
}

fn code_segment(
    element: &CodeElement,
    document_id: &str,
    session_id: &str,
    index: usize,
) -> TextSegment {
    let text = format!(
        "[{}] {}.{} (Lines {}-{})\n{}",
        element.kind.as_ref().to_uppercase(),
        element.class_name,
        element.name,
        element.start_line,
        element.end_line,
        element.source
    );

    base_segment(text, document_id, session_id, index)
        .with("type", element.kind)
        .with("name", &element.name)
        .with("class", &element.class_name)
        .with("package", &element.package)
        .with("modifiers", &element.modifiers)
        .with("startLine", element.start_line)
        .with("endLine", element.end_line)
        .with("javadoc", &element.javadoc)
        .with("contentType", "java_code")
}

fn count_kind(elements: &[CodeElement], kind: ElementKind) -> usize {
    elements.iter().filter(|e| e.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use codelab_vector::VectorStore;

    use super::*;
    use crate::embedding::EmbeddingProvider;

    const SOURCE: &str = "package shop;\n\npublic class Cart {\n    private int count;\n\n    public int size() {\n        return count;\n    }\n}\n";

    fn service() -> DocumentProcessingService {
        let store = EmbeddingStore::new(VectorStore::memory(), EmbeddingProvider::mock(), "");
        DocumentProcessingService::new(store, RagConfig::default())
    }

    #[test]
    fn detects_accepted_uploads() {
        let config = RagConfig::default();
        assert_eq!(DocumentType::detect("Cart.JAVA", 10, &config), Some(DocumentType::Java));
        assert_eq!(DocumentType::detect("doc.pdf", 10, &config), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::detect("Cart.java", 0, &config), None);
        assert_eq!(DocumentType::detect("Cart.java", 100 * 1024 + 1, &config), None);
        assert_eq!(DocumentType::detect("notes.txt", 10, &config), None);
    }

    #[test]
    fn failure_without_metadata_deserializes() {
        let value = serde_json::to_value(DocumentUpload::failure("nope")).unwrap();
        assert!(value.get("metadata").is_none());

        let upload: DocumentUpload = serde_json::from_value(value).unwrap();
        assert!(!upload.success);
        assert!(upload.metadata.is_empty());
    }

    #[tokio::test]
    async fn java_upload_is_indexed() {
        let service = service();
        let upload = service.process_java("Cart.java", SOURCE.as_bytes(), "s-1").await;

        assert!(upload.success, "{}", upload.message);
        assert_eq!(upload.message, JAVA_SUCCESS_MESSAGE);
        assert_eq!(upload.document_type, Some(DocumentType::Java));
        // package, class, method, field
        assert_eq!(upload.segments_processed, 4);
        assert_eq!(upload.metadata["classes"], json!(1));
        assert_eq!(upload.metadata["methods"], json!(1));
        assert_eq!(upload.metadata["codeLines"], json!(1 + 7 + 3 + 1));
        assert_eq!(upload.metadata["vectorStore"], json!("memory"));

        let document_id = upload.document_id.unwrap();
        let info = service.document(&document_id).await.unwrap();
        assert_eq!(info.content, "Java code with 4 semantic segments");
        assert_eq!(service.documents_for_session("s-1").await.len(), 1);
        assert!(service.documents_for_session("s-2").await.is_empty());
    }

    #[tokio::test]
    async fn empty_java_file_is_rejected() {
        let upload = service()
            .process_java("Empty.java", b"// nothing here\n", "s-1")
            .await;
        assert!(!upload.success);
        assert_eq!(upload.message, JAVA_EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn unsupported_upload_is_rejected() {
        let upload = service().process("notes.txt", b"hello", "s-1").await;
        assert!(!upload.success);
        assert_eq!(upload.message, UNSUPPORTED_UPLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn invalid_pdf_reports_error() {
        let upload = service().process("doc.pdf", b"not a pdf", "s-1").await;
        assert!(!upload.success);
        assert!(upload.message.starts_with("Error processing PDF file: "));
    }

    #[test]
    fn code_segment_carries_location() {
        let element = parse_java(SOURCE)
            .into_iter()
            .find(|e| e.kind == ElementKind::Method)
            .unwrap();
        let segment = code_segment(&element, "doc", "s-1", 3);

        assert!(segment.text.starts_with("[METHOD] Cart.size (Lines 6-8)\npublic int size()"));
        assert_eq!(segment.get("chunkIndex"), Some("3"));
        assert_eq!(segment.get("contentType"), Some("java_code"));
        assert_eq!(segment.reference(), "[method] Cart.size (Lines 6-8)");
        assert!(segment.get("source").is_none());
    }
}
