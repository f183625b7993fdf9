//! Code generator handlers.
//!
//! Generation is not implemented yet; requests are acknowledged with
//! placeholder code.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::{Placeholder, ServiceHealth};
use crate::service::ServiceState;

/// Tracing target for code generator operations.
const TRACING_TARGET: &str = "codelab_server::handler::code_generator";

#[tracing::instrument(skip_all)]
async fn health() -> Result<(StatusCode, Json<ServiceHealth>)> {
    let health = ServiceHealth::up("Code Generator")
        .with_description("Code Generator Service - AI Code Generation");
    Ok((StatusCode::OK, Json(health)))
}

fn health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Check code generator health")
        .response::<200, Json<ServiceHealth>>()
}

#[tracing::instrument(skip_all)]
async fn generate_code(
    Json(request): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Placeholder>)> {
    tracing::debug!(
        target: TRACING_TARGET,
        fields = %request.len(),
        "Code generation requested"
    );
    Ok((StatusCode::OK, Json(Placeholder::generated_code())))
}

fn generate_code_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Generate code")
        .description("Not implemented yet, returns placeholder code.")
        .response::<200, Json<Placeholder>>()
}

#[tracing::instrument(skip_all)]
async fn generate_tests(
    Json(request): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Placeholder>)> {
    tracing::debug!(
        target: TRACING_TARGET,
        fields = %request.len(),
        "Test generation requested"
    );
    Ok((StatusCode::OK, Json(Placeholder::generated_tests())))
}

fn generate_tests_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Generate tests")
        .description("Not implemented yet, returns placeholder tests.")
        .response::<200, Json<Placeholder>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health, health_docs))
        .api_route("/generate", post_with(generate_code, generate_code_docs))
        .api_route("/generate/tests", post_with(generate_tests, generate_tests_docs))
        .with_path_items(|item| item.tag("Code Generator"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handler::test::create_test_server_with_router;

    #[tokio::test]
    async fn health_reports_description() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let health = server.get("/health").await.json::<ServiceHealth>();
        assert_eq!(health.service, "Code Generator");
        assert_eq!(
            health.description.as_deref(),
            Some("Code Generator Service - AI Code Generation")
        );
        Ok(())
    }

    #[tokio::test]
    async fn generation_returns_placeholders() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let request = json!({ "requirements": "A stack", "language": "java" });

        let body = server.post("/generate").json(&request).await.json::<Value>();
        assert_eq!(body["message"], "Code generation feature coming soon!");
        assert_eq!(body["generatedCode"], "// Placeholder for generated code");

        let body = server
            .post("/generate/tests")
            .json(&request)
            .await
            .json::<Value>();
        assert_eq!(body["message"], "Test generation feature coming soon!");
        assert_eq!(body["generatedTests"], "// Placeholder for generated tests");
        Ok(())
    }
}
