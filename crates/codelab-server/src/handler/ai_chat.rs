//! AI chat handlers.
//!
//! Only the health check is functional; the chat endpoints acknowledge
//! requests with placeholder responses.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::{Placeholder, ServiceHealth};
use crate::service::ServiceState;

/// Tracing target for AI chat operations.
const TRACING_TARGET: &str = "codelab_server::handler::ai_chat";

#[tracing::instrument(skip_all)]
async fn health() -> Result<(StatusCode, Json<ServiceHealth>)> {
    let health = ServiceHealth::up("AI Chat").with_description("AI Chat Service - Conversational AI");
    Ok((StatusCode::OK, Json(health)))
}

fn health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Check AI chat health")
        .response::<200, Json<ServiceHealth>>()
}

/// Accepts a chat message.
#[tracing::instrument(skip_all)]
async fn send_message(
    Json(request): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Placeholder>)> {
    tracing::debug!(
        target: TRACING_TARGET,
        fields = %request.len(),
        "Chat message received"
    );
    Ok((StatusCode::OK, Json(Placeholder::chat_message())))
}

fn send_message_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Send chat message")
        .description("Not implemented yet, any JSON object is acknowledged.")
        .response::<200, Json<Placeholder>>()
}

#[tracing::instrument(skip_all)]
async fn chat_history() -> Result<(StatusCode, Json<Placeholder>)> {
    Ok((StatusCode::OK, Json(Placeholder::chat_history())))
}

fn chat_history_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get chat history")
        .description("Not implemented yet, the history is always empty.")
        .response::<200, Json<Placeholder>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health, health_docs))
        .api_route("/chat/send", post_with(send_message, send_message_docs))
        .api_route("/chat/history", get_with(chat_history, chat_history_docs))
        .with_path_items(|item| item.tag("AI Chat"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handler::test::create_test_server_with_router;

    #[tokio::test]
    async fn health_reports_version() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let health = server.get("/health").await.json::<ServiceHealth>();
        assert_eq!(health.status, "UP");
        assert_eq!(health.service, "AI Chat");
        assert_eq!(health.version.as_deref(), Some("1.0.0"));
        assert_eq!(
            health.description.as_deref(),
            Some("AI Chat Service - Conversational AI")
        );
        Ok(())
    }

    #[tokio::test]
    async fn chat_endpoints_are_placeholders() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server
            .post("/chat/send")
            .json(&json!({ "message": "hello" }))
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "AI Chat feature coming soon!");
        assert!(body["timestamp"].is_string());

        let body = server.get("/chat/history").await.json::<Value>();
        assert_eq!(body["message"], "Chat history feature coming soon!");
        assert_eq!(body["history"], json!([]));
        Ok(())
    }
}
