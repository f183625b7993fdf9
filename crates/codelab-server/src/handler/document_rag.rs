//! Document RAG handlers.
//!
//! Java sources and PDFs are uploaded into a session, indexed, and then
//! queried in natural language. Every question only sees the documents of
//! its own session.

use std::collections::BTreeMap;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use codelab_rig::rag::{
    DocumentChatRequest, DocumentChatResponse, DocumentInfo, DocumentType, DocumentUpload,
    RagService, UNSUPPORTED_UPLOAD_MESSAGE,
};

use crate::extract::{Json, Multipart, Path};
use crate::handler::request::SessionPathParams;
use crate::handler::response::{ConversationHistory, HistoryCleared, ServiceHealth};
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Tracing target for document RAG operations.
const TRACING_TARGET: &str = "codelab_server::handler::document_rag";

/// Multipart field holding the uploaded file.
const FILE_FIELD: &str = "file";

/// Multipart field holding the session identifier.
const SESSION_FIELD: &str = "sessionId";

/// A file read from a multipart upload.
struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
}

/// Uploads and indexes a document.
#[tracing::instrument(skip_all)]
async fn upload_document(
    State(rag): State<RagService>,
    Multipart(mut multipart): Multipart,
) -> Result<(StatusCode, Json<DocumentUpload>)> {
    let mut file = None;
    let mut session_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(target: TRACING_TARGET, error = %err, "Error reading upload");
                let response = DocumentUpload::failure(format!("Error uploading document: {err}"));
                return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)));
            }
        };

        match field.name() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some(UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        });
                    }
                    Err(err) => {
                        tracing::error!(target: TRACING_TARGET, error = %err, "Error reading file");
                        let response =
                            DocumentUpload::failure(format!("Error uploading document: {err}"));
                        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)));
                    }
                }
            }
            Some(SESSION_FIELD) => {
                session_id = field.text().await.ok().map(|text| text.trim().to_owned());
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| {
        ErrorKind::BadRequest
            .with_message("Missing 'file' field in multipart request")
            .with_resource("upload")
    })?;
    let session_id = session_id.filter(|id| !id.is_empty()).ok_or_else(|| {
        ErrorKind::BadRequest
            .with_message("Missing 'sessionId' field in multipart request")
            .with_resource("upload")
    })?;

    tracing::info!(
        target: TRACING_TARGET,
        file_name = %file.file_name,
        size = %file.bytes.len(),
        session_id = %session_id,
        "File upload received"
    );

    let config = rag.processing().config();
    if DocumentType::detect(&file.file_name, file.bytes.len(), config).is_none() {
        tracing::warn!(
            target: TRACING_TARGET,
            file_name = %file.file_name,
            "Unsupported file rejected"
        );
        let response = DocumentUpload::failure(UNSUPPORTED_UPLOAD_MESSAGE);
        return Ok((StatusCode::BAD_REQUEST, Json(response)));
    }

    let response = rag
        .processing()
        .process(&file.file_name, &file.bytes, &session_id)
        .await;

    tracing::info!(
        target: TRACING_TARGET,
        success = %response.success,
        segments = %response.segments_processed,
        "Upload processed"
    );
    Ok((StatusCode::OK, Json(response)))
}

fn upload_document_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Upload document")
        .description(
            "Indexes a `.java` file of up to 100 KB or a PDF of up to 10 MB, sent as the \
             multipart `file` field together with a `sessionId` field.",
        )
        .response::<200, Json<DocumentUpload>>()
        .response::<400, Json<DocumentUpload>>()
        .response::<500, Json<DocumentUpload>>()
}

/// Lists the documents uploaded in a session.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn list_documents(
    State(rag): State<RagService>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<Vec<DocumentInfo>>)> {
    let documents = rag
        .processing()
        .documents_for_session(&path_params.session_id)
        .await;
    Ok((StatusCode::OK, Json(documents)))
}

fn list_documents_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List session documents")
        .response::<200, Json<Vec<DocumentInfo>>>()
}

/// Answers a question about the session's documents.
#[tracing::instrument(skip_all)]
async fn chat(
    State(rag): State<RagService>,
    Json(request): Json<DocumentChatRequest>,
) -> Result<(StatusCode, Json<DocumentChatResponse>)> {
    let response = rag.chat().chat(&request).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(response)))
}

fn chat_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Chat with documents")
        .description(
            "Detects the intent of the question, retrieves the closest segments of the \
             session's documents and answers with them.",
        )
        .response::<200, Json<DocumentChatResponse>>()
        .response::<400, Json<DocumentChatResponse>>()
}

/// Returns the conversation transcript of a session.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn conversation_history(
    State(rag): State<RagService>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<ConversationHistory>)> {
    let messages = rag
        .chat()
        .conversation_history(&path_params.session_id)
        .await;
    let history = ConversationHistory {
        session_id: path_params.session_id,
        messages,
    };
    Ok((StatusCode::OK, Json(history)))
}

fn conversation_history_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get conversation history")
        .response::<200, Json<ConversationHistory>>()
}

/// Forgets the conversation transcript of a session.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn clear_conversation_history(
    State(rag): State<RagService>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<HistoryCleared>)> {
    let session_id = path_params.session_id;
    let cleared = rag.chat().clear_conversation_history(&session_id).await;

    let (status, message) = if cleared {
        (StatusCode::OK, "Conversation history cleared successfully")
    } else {
        (StatusCode::NOT_FOUND, "No conversation history found")
    };
    let response = HistoryCleared {
        session_id,
        success: cleared,
        message: message.to_owned(),
    };
    Ok((status, Json(response)))
}

fn clear_conversation_history_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Clear conversation history")
        .response::<200, Json<HistoryCleared>>()
        .response::<404, Json<HistoryCleared>>()
}

/// Returns the example phrases of every search intent.
#[tracing::instrument(skip_all)]
async fn intents(
    State(rag): State<RagService>,
) -> Result<(StatusCode, Json<BTreeMap<String, Vec<String>>>)> {
    let examples = rag
        .intents()
        .intent_examples()
        .into_iter()
        .map(|(intent, examples)| {
            let examples = examples.iter().map(|e| (*e).to_owned()).collect();
            (intent.as_str().to_owned(), examples)
        })
        .collect();
    Ok((StatusCode::OK, Json(examples)))
}

fn intents_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List search intents")
        .description("Maps every search intent to the phrases that represent it.")
        .response::<200, Json<BTreeMap<String, Vec<String>>>>()
}

/// Reports that the document RAG module is up.
#[tracing::instrument(skip_all)]
async fn health() -> Result<(StatusCode, Json<ServiceHealth>)> {
    Ok((StatusCode::OK, Json(ServiceHealth::up("document-rag"))))
}

fn health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Check document RAG health")
        .response::<200, Json<ServiceHealth>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/upload", post_with(upload_document, upload_document_docs))
        .api_route(
            "/sessions/{sessionId}/documents",
            get_with(list_documents, list_documents_docs),
        )
        .api_route("/chat", post_with(chat, chat_docs))
        .api_route(
            "/chat/{sessionId}/history",
            get_with(conversation_history, conversation_history_docs)
                .delete_with(clear_conversation_history, clear_conversation_history_docs),
        )
        .api_route("/intents", get_with(intents, intents_docs))
        .api_route("/health", get_with(health, health_docs))
        .with_path_items(|item| item.tag("Document RAG"))
}
