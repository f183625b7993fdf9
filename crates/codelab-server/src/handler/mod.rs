//! All `aide::axum::`[`ApiRouter`]s with related `axum::`[`Handler`]s.
//!
//! | prefix                      | module          |
//! |-----------------------------|-----------------|
//! | `/api/v1/code`              | code assistant  |
//! | `/api/v1/document-rag`      | document RAG    |
//! | `/api/v1/ai-chat`           | AI chat         |
//! | `/api/v1/code-generator`    | code generator  |
//!
//! [`ApiRouter`]: aide::axum::ApiRouter
//! [`Handler`]: axum::handler::Handler

mod ai_chat;
mod code_assistant;
mod code_generator;
mod document_rag;
mod error;
mod request;
mod response;

use aide::axum::ApiRouter;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::request::*;
pub use crate::handler::response::*;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns an [`ApiRouter`] with all routes under `/api/v1`.
pub fn routes() -> ApiRouter<ServiceState> {
    ApiRouter::new()
        .nest("/api/v1/code", code_assistant::routes())
        .nest("/api/v1/document-rag", document_rag::routes())
        .nest("/api/v1/ai-chat", ai_chat::routes())
        .nest("/api/v1/code-generator", code_generator::routes())
        .fallback(fallback)
}
