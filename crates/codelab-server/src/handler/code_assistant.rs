//! Code assistant handlers.
//!
//! Sessions hold the conversation window of a client. Every analysis names
//! the chat service that answers it, e.g. `openai`, `groq` or a registered
//! service name, and is answered either as one JSON document or as a stream
//! of Server-Sent Events.
//!
//! ## Streaming
//!
//! Streaming endpoints emit `content` events while the model generates,
//! followed by one `complete` or `error` event. Setup failures, such as an
//! unknown session, are reported as a single `error` event.

use std::collections::BTreeMap;
use std::convert::Infallible;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use codelab_rig::analysis::{
    AnalysisRequest, AnalysisResponse, AnalysisStream, AnalysisType, CodeAnalysisService,
    StreamingAnalysisResponse,
};
use codelab_rig::session::SessionManager;
use futures::{StreamExt, stream};
use tokio_stream::wrappers::ReceiverStream;

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::request::{CodeAnalysis, ServicePathParams, SessionPathParams};
use crate::handler::response::{ErrorResponse, ServiceStats, SessionResponse, SessionStats};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for code assistant operations.
const TRACING_TARGET: &str = "codelab_server::handler::code_assistant";

/// Server-Sent Events response of the streaming endpoints.
type EventStream = Sse<KeepAliveStream<ReceiverStream<std::result::Result<Event, Infallible>>>>;

/// Reports whether any AI service can answer.
#[tracing::instrument(skip_all)]
async fn health(
    State(analysis): State<CodeAnalysisService>,
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, String)> {
    let service_count = analysis.available_service_count();
    let session_count = sessions.active_session_count().await;

    if !analysis.has_available_service() {
        tracing::warn!(target: TRACING_TARGET, "No AI services are available");
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service is running but no AI services are available".to_owned(),
        ));
    }

    Ok((
        StatusCode::OK,
        format!(
            "Service is healthy with {service_count} AI services available and {session_count} active sessions"
        ),
    ))
}

fn health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Check service health")
        .description("Returns the number of available AI services and active sessions.")
        .response::<200, String>()
        .response::<503, String>()
}

/// Creates a new conversation session.
#[tracing::instrument(skip_all)]
async fn create_session(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session_id = sessions.create_session().await;
    let active = sessions.active_session_count().await;

    tracing::info!(
        target: TRACING_TARGET,
        session_id = %session_id,
        active_sessions = %active,
        "Session created"
    );

    let response =
        SessionResponse::success("Session created successfully", active).with_session_id(session_id);
    Ok((StatusCode::OK, Json(response)))
}

fn create_session_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Create session")
        .description("Creates a session whose messages give later requests their context.")
        .response::<200, Json<SessionResponse>>()
}

/// Clears a single session.
#[tracing::instrument(skip_all, fields(session_id = %path_params.session_id))]
async fn clear_session(
    State(sessions): State<SessionManager>,
    Path(path_params): Path<SessionPathParams>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session_id = path_params.session_id;
    let cleared = sessions.clear_session(&session_id).await;
    let active = sessions.active_session_count().await;

    if !cleared {
        tracing::debug!(target: TRACING_TARGET, "Session to clear was not found");
        let response = SessionResponse::failure("Session not found", active).with_session_id(session_id);
        return Ok((StatusCode::NOT_FOUND, Json(response)));
    }

    let response =
        SessionResponse::success("Session cleared successfully", active).with_session_id(session_id);
    Ok((StatusCode::OK, Json(response)))
}

fn clear_session_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Clear session")
        .description("Removes a session and its conversation window.")
        .response::<200, Json<SessionResponse>>()
        .response::<404, Json<SessionResponse>>()
}

/// Clears every session.
#[tracing::instrument(skip_all)]
async fn clear_all_sessions(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let cleared = sessions.clear_all_sessions().await;
    let active = sessions.active_session_count().await;

    tracing::info!(target: TRACING_TARGET, cleared = %cleared, "All sessions cleared");

    let message = format!("All sessions cleared successfully. Cleared {cleared} sessions");
    Ok((StatusCode::OK, Json(SessionResponse::success(message, active))))
}

fn clear_all_sessions_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Clear all sessions")
        .response::<200, Json<SessionResponse>>()
}

/// Returns the active sessions.
#[tracing::instrument(skip_all)]
async fn session_stats(
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<SessionStats>)> {
    let stats = SessionStats {
        active_session_count: sessions.active_session_count().await,
        active_session_ids: sessions.active_session_ids().await,
    };
    Ok((StatusCode::OK, Json(stats)))
}

fn session_stats_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get session statistics")
        .response::<200, Json<SessionStats>>()
}

/// Analyzes code within an existing session.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn assist(
    State(analysis): State<CodeAnalysisService>,
    State(sessions): State<SessionManager>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let request = payload.into_analysis_request(None)?;
    let session_id = request.session_id.clone();

    tracing::info!(
        target: TRACING_TARGET,
        session_id = %session_id,
        analysis_type = %request.analysis_type,
        language = %request.language,
        code_len = %request.code.len(),
        api_key = %request.api_key.is_some(),
        "Assist request received"
    );

    if !sessions.session_exists(&session_id).await {
        let response = AnalysisResponse::failure(
            format!("Error: Session not found - {session_id}"),
            request.analysis_type,
            &request.language,
        );
        return Ok((StatusCode::BAD_REQUEST, Json(response.with_session_id(session_id))));
    }

    let (status, response) = run_analysis(&analysis, &path_params.service, &request).await;
    Ok((status, Json(response.with_session_id(session_id))))
}

fn assist_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Assist within a session")
        .description(
            "Analyzes code with the named service, replaying the session's previous \
             messages as context.",
        )
        .response::<200, Json<AnalysisResponse>>()
        .response::<400, Json<AnalysisResponse>>()
        .response::<500, Json<AnalysisResponse>>()
        .response::<503, Json<AnalysisResponse>>()
}

/// Streams an analysis within an existing session.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn assist_stream(
    State(analysis): State<CodeAnalysisService>,
    State(sessions): State<SessionManager>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<EventStream> {
    let request = payload.into_analysis_request(None)?;
    let session_id = request.session_id.clone();

    if !sessions.session_exists(&session_id).await {
        let event = StreamingAnalysisResponse::error(
            format!("Session not found - {session_id}"),
            Some(request.analysis_type),
            Some(request.language.clone()),
        );
        return Ok(single_event(event.with_session_id(&session_id)));
    }

    let events = match analysis.stream_analysis(&request, &path_params.service).await {
        Ok(events) => events,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET,
                session_id = %session_id,
                error = %err,
                "Failed to start assist stream"
            );
            let event = stream_setup_error(&err, &request).with_session_id(&session_id);
            return Ok(single_event(event));
        }
    };

    Ok(stream_events(events, Some(session_id)))
}

/// Answers a follow-up question about the session's conversation.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn followup(
    State(analysis): State<CodeAnalysisService>,
    State(sessions): State<SessionManager>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let request = payload.into_analysis_request(Some(AnalysisType::Followup))?;
    let session_id = request.session_id.clone();

    if !sessions.session_exists(&session_id).await {
        tracing::warn!(
            target: TRACING_TARGET,
            session_id = %session_id,
            "Follow-up request with invalid session"
        );
        let response = AnalysisResponse::failure(
            "Error: Invalid session ID. Please start a new conversation.",
            request.analysis_type,
            &request.language,
        );
        return Ok((StatusCode::BAD_REQUEST, Json(response.with_session_id(session_id))));
    }

    let response = match analysis.analyze_code(&request, &path_params.service).await {
        Ok(response) => {
            tracing::info!(
                target: TRACING_TARGET,
                session_id = %session_id,
                "Follow-up response generated"
            );
            return Ok((StatusCode::OK, Json(response)));
        }
        Err(err) if err.is_service_error() => {
            tracing::error!(target: TRACING_TARGET, error = %err, "AI service error during follow-up");
            AnalysisResponse::failure(format!("Error: {err}"), request.analysis_type, &request.language)
        }
        Err(err) => {
            tracing::error!(target: TRACING_TARGET, error = %err, "Unexpected error during follow-up");
            AnalysisResponse::failure(
                "Error: An unexpected error occurred",
                request.analysis_type,
                &request.language,
            )
        }
    };

    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(response.with_session_id(session_id)),
    ))
}

fn followup_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Ask a follow-up question")
        .description("Answers the `code` field as a question about the session's conversation.")
        .response::<200, Json<AnalysisResponse>>()
        .response::<400, Json<AnalysisResponse>>()
        .response::<500, Json<AnalysisResponse>>()
}

/// Analyzes code with the requested analysis type.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn analyze(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    analyze_as(&analysis, &path_params.service, payload, None).await
}

fn analyze_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Analyze code")
        .description("Runs the requested analysis type with the named service.")
        .response::<200, Json<AnalysisResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<500, Json<AnalysisResponse>>()
        .response::<503, Json<AnalysisResponse>>()
}

/// Explains code.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn explain(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    analyze_as(&analysis, &path_params.service, payload, Some(AnalysisType::Explain)).await
}

/// Suggests refactorings.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn refactor(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    analyze_as(&analysis, &path_params.service, payload, Some(AnalysisType::Refactor)).await
}

/// Looks for bugs.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn debug(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    analyze_as(&analysis, &path_params.service, payload, Some(AnalysisType::Debug)).await
}

fn typed_analysis_docs(op: TransformOperation) -> TransformOperation {
    op.description("The analysis type is implied by the path; `analysisType` is ignored.")
        .response::<200, Json<AnalysisResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<500, Json<AnalysisResponse>>()
        .response::<503, Json<AnalysisResponse>>()
}

/// Streams an analysis with the requested analysis type.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn analyze_stream(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<EventStream> {
    stream_as(&analysis, &path_params.service, payload, None).await
}

/// Streams an explanation.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn explain_stream(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<EventStream> {
    stream_as(&analysis, &path_params.service, payload, Some(AnalysisType::Explain)).await
}

/// Streams refactoring suggestions.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn refactor_stream(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<EventStream> {
    stream_as(&analysis, &path_params.service, payload, Some(AnalysisType::Refactor)).await
}

/// Streams a debugging analysis.
#[tracing::instrument(skip_all, fields(service = %path_params.service))]
async fn debug_stream(
    State(analysis): State<CodeAnalysisService>,
    Path(path_params): Path<ServicePathParams>,
    ValidateJson(payload): ValidateJson<CodeAnalysis>,
) -> Result<EventStream> {
    stream_as(&analysis, &path_params.service, payload, Some(AnalysisType::Debug)).await
}

/// Returns the available services with their implementation.
#[tracing::instrument(skip_all)]
async fn services(
    State(analysis): State<CodeAnalysisService>,
) -> Result<(StatusCode, Json<BTreeMap<String, String>>)> {
    let services = analysis
        .available_services()
        .into_iter()
        .map(|(name, service)| (name, service.implementation()))
        .collect();
    Ok((StatusCode::OK, Json(services)))
}

fn services_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List available services")
        .description("Maps every service name to the implementation answering it.")
        .response::<200, Json<BTreeMap<String, String>>>()
}

/// Returns service and session counts.
#[tracing::instrument(skip_all)]
async fn service_stats(
    State(analysis): State<CodeAnalysisService>,
    State(sessions): State<SessionManager>,
) -> Result<(StatusCode, Json<ServiceStats>)> {
    let stats = ServiceStats {
        available_services: analysis.available_service_count(),
        has_services: analysis.has_available_service(),
        services: analysis.available_services().into_keys().collect(),
        active_session_count: sessions.active_session_count().await,
    };
    Ok((StatusCode::OK, Json(stats)))
}

fn service_stats_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get service statistics")
        .response::<200, Json<ServiceStats>>()
}

async fn analyze_as(
    analysis: &CodeAnalysisService,
    service: &str,
    payload: CodeAnalysis,
    analysis_type: Option<AnalysisType>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let request = payload.into_analysis_request(analysis_type)?;
    tracing::info!(
        target: TRACING_TARGET,
        analysis_type = %request.analysis_type,
        session_id = %request.session_id,
        "Analysis request received"
    );

    let (status, response) = run_analysis(analysis, service, &request).await;
    Ok((status, Json(response)))
}

async fn stream_as(
    analysis: &CodeAnalysisService,
    service: &str,
    payload: CodeAnalysis,
    analysis_type: Option<AnalysisType>,
) -> Result<EventStream> {
    let request = payload.into_analysis_request(analysis_type)?;
    tracing::info!(
        target: TRACING_TARGET,
        analysis_type = %request.analysis_type,
        session_id = %request.session_id,
        "Streaming analysis request received"
    );

    match analysis.stream_analysis(&request, service).await {
        Ok(events) => Ok(stream_events(events, None)),
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET,
                error = %err,
                "Failed to start analysis stream"
            );
            Ok(single_event(stream_setup_error(&err, &request)))
        }
    }
}

/// Runs an analysis and maps failures to `503` for service errors and
/// `500` for everything else.
async fn run_analysis(
    analysis: &CodeAnalysisService,
    service: &str,
    request: &AnalysisRequest,
) -> (StatusCode, AnalysisResponse) {
    match analysis.analyze_code(request, service).await {
        Ok(response) => (StatusCode::OK, response),
        Err(err) => {
            let (status, message) = if err.is_service_error() {
                tracing::error!(target: TRACING_TARGET, error = %err, "AI service error during analysis");
                (StatusCode::SERVICE_UNAVAILABLE, format!("Error: {err}"))
            } else {
                tracing::error!(target: TRACING_TARGET, error = %err, "Unexpected error during analysis");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Unexpected error: {err}"))
            };
            let response =
                AnalysisResponse::failure(message, request.analysis_type, &request.language);
            (status, response)
        }
    }
}

fn stream_setup_error(
    err: &codelab_rig::Error,
    request: &AnalysisRequest,
) -> StreamingAnalysisResponse {
    StreamingAnalysisResponse::error(
        err.to_string(),
        Some(request.analysis_type),
        Some(request.language.clone()),
    )
}

fn single_event(event: StreamingAnalysisResponse) -> EventStream {
    stream_events(stream::iter([event]).boxed(), None)
}

/// Forwards analysis events to the client until the stream ends.
///
/// The analysis runs to completion even after the client disconnects, so
/// the answer still reaches the session memory.
fn stream_events(events: AnalysisStream, session_id: Option<String>) -> EventStream {
    let (tx, rx) = tokio::sync::mpsc::channel::<std::result::Result<Event, Infallible>>(32);

    tokio::spawn(async move {
        let mut events = events;
        let mut connected = true;
        while let Some(event) = events.next().await {
            if !connected {
                continue;
            }

            let event_type = event.event_type.as_str();
            let event = match serde_json::to_string(&event) {
                Ok(json) => Event::default().event(event_type).data(json),
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        session_id = ?session_id,
                        error = %err,
                        "Failed to serialize analysis event"
                    );
                    continue;
                }
            };

            // A failed send means the client went away.
            if tx.send(Ok(event)).await.is_err() {
                tracing::info!(
                    target: TRACING_TARGET,
                    session_id = ?session_id,
                    "Client disconnected, finishing analysis without streaming"
                );
                connected = false;
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            session_id = ?session_id,
            "Analysis stream completed"
        );
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/health", get_with(health, health_docs))
        .api_route(
            "/sessions",
            post_with(create_session, create_session_docs)
                .delete_with(clear_all_sessions, clear_all_sessions_docs),
        )
        .api_route("/sessions/stats", get_with(session_stats, session_stats_docs))
        .api_route(
            "/sessions/{sessionId}",
            delete_with(clear_session, clear_session_docs),
        )
        .api_route("/assist/{service}", post_with(assist, assist_docs))
        .api_route(
            "/assist/{service}/followup",
            post_with(followup, followup_docs),
        )
        .api_route("/analyze/{service}", post_with(analyze, analyze_docs))
        .api_route(
            "/explain/{service}",
            post_with(explain, |op| typed_analysis_docs(op.summary("Explain code"))),
        )
        .api_route(
            "/refactor/{service}",
            post_with(refactor, |op| typed_analysis_docs(op.summary("Refactor code"))),
        )
        .api_route(
            "/debug/{service}",
            post_with(debug, |op| typed_analysis_docs(op.summary("Debug code"))),
        )
        .api_route("/services", get_with(services, services_docs))
        .api_route("/services/stats", get_with(service_stats, service_stats_docs))
        // SSE endpoints use regular axum routing as aide doesn't document SSE
        .route("/assist/{service}/stream", axum::routing::post(assist_stream))
        .route("/analyze/{service}/stream", axum::routing::post(analyze_stream))
        .route("/explain/{service}/stream", axum::routing::post(explain_stream))
        .route("/refactor/{service}/stream", axum::routing::post(refactor_stream))
        .route("/debug/{service}/stream", axum::routing::post(debug_stream))
        .with_path_items(|item| item.tag("Code Assistant"))
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRef;
    use codelab_rig::analysis::MockChatService;
    use serde_json::{Value, json};

    use super::*;
    use crate::handler::test::{MOCK_REPLY, create_test_server_with_router};

    fn payload(session_id: &str, analysis_type: &str) -> Value {
        json!({
            "code": "public class Cart { int total; }",
            "analysisType": analysis_type,
            "language": "java",
            "sessionId": session_id,
        })
    }

    #[tokio::test]
    async fn disconnected_stream_still_updates_memory() -> anyhow::Result<()> {
        let state = ServiceState::mock(MOCK_REPLY).await?;
        let analysis = CodeAnalysisService::from_ref(&state);
        let sessions = SessionManager::from_ref(&state);
        let session_id = sessions.create_session().await;

        let request = AnalysisRequest::new("int a;", AnalysisType::Explain, "java", &session_id);
        let events = analysis
            .stream_analysis(&request, MockChatService::NAME)
            .await?;
        drop(stream_events(events, Some(session_id.clone())));

        let memory = sessions
            .session_memory(&session_id)
            .await
            .ok_or_else(|| anyhow::anyhow!("session disappeared"))?;
        for _ in 0..100 {
            if memory.len().await == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(memory.len().await, 2);
        Ok(())
    }

    async fn create_session(server: &axum_test::TestServer) -> String {
        let response = server.post("/sessions").await;
        response.assert_status_ok();
        response.json::<SessionResponse>().session_id.unwrap_or_default()
    }

    #[tokio::test]
    async fn health_reports_services_and_sessions() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        create_session(&server).await;

        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_text(
            "Service is healthy with 3 AI services available and 1 active sessions",
        );
        Ok(())
    }

    #[tokio::test]
    async fn session_lifecycle() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;
        assert!(!session_id.is_empty());

        let stats = server.get("/sessions/stats").await.json::<SessionStats>();
        assert_eq!(stats.active_session_count, 1);
        assert_eq!(stats.active_session_ids, vec![session_id.clone()]);

        let response = server.delete(&format!("/sessions/{session_id}")).await;
        response.assert_status_ok();
        let body = response.json::<SessionResponse>();
        assert!(body.success);
        assert_eq!(body.message, "Session cleared successfully");
        assert_eq!(body.active_session_count, 0);

        let response = server.delete(&format!("/sessions/{session_id}")).await;
        response.assert_status_not_found();
        let body = response.json::<SessionResponse>();
        assert!(!body.success);
        assert_eq!(body.message, "Session not found");
        Ok(())
    }

    #[tokio::test]
    async fn clear_all_sessions_reports_count() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        create_session(&server).await;
        create_session(&server).await;

        let response = server.delete("/sessions").await;
        response.assert_status_ok();
        let body = response.json::<SessionResponse>();
        assert_eq!(
            body.message,
            "All sessions cleared successfully. Cleared 2 sessions"
        );
        assert_eq!(body.active_session_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn assist_requires_existing_session() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server
            .post("/assist/openai")
            .json(&payload("missing", "EXPLAIN"))
            .await;
        response.assert_status_bad_request();

        let body = response.json::<AnalysisResponse>();
        assert!(!body.success);
        assert_eq!(body.analysis, "Error: Session not found - missing");
        assert_eq!(body.session_id.as_deref(), Some("missing"));
        Ok(())
    }

    #[tokio::test]
    async fn assist_answers_with_provider() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let response = server
            .post("/assist/openai")
            .json(&payload(&session_id, "EXPLAIN"))
            .await;
        response.assert_status_ok();

        let body = response.json::<AnalysisResponse>();
        assert!(body.success);
        assert_eq!(body.analysis, MOCK_REPLY);
        assert_eq!(body.analysis_type, AnalysisType::Explain);
        assert_eq!(body.session_id.as_deref(), Some(session_id.as_str()));
        assert!(body.conversation_context.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn assist_with_unknown_service_is_unavailable() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let response = server
            .post("/assist/unknown")
            .json(&payload(&session_id, "DEBUG"))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let body = response.json::<AnalysisResponse>();
        assert!(!body.success);
        assert!(body.analysis.starts_with("Error: Service 'unknown' is not available"));
        Ok(())
    }

    #[tokio::test]
    async fn assist_rejects_blank_code() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let mut body = payload(&session_id, "EXPLAIN");
        body["code"] = json!("");
        let response = server.post("/assist/openai").json(&body).await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn followup_forces_followup_type() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let response = server
            .post("/assist/openai/followup")
            .json(&payload(&session_id, "EXPLAIN"))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<AnalysisResponse>().analysis_type,
            AnalysisType::Followup
        );

        let response = server
            .post("/assist/openai/followup")
            .json(&payload("missing", "EXPLAIN"))
            .await;
        response.assert_status_bad_request();
        assert_eq!(
            response.json::<AnalysisResponse>().analysis,
            "Error: Invalid session ID. Please start a new conversation."
        );
        Ok(())
    }

    #[tokio::test]
    async fn analyze_without_session_is_unavailable() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server
            .post("/analyze/openai")
            .json(&payload("missing", "ANALYZE"))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let body = response.json::<AnalysisResponse>();
        assert_eq!(body.analysis, "Error: Session not found: missing");
        assert_eq!(body.session_id, None);

        let response = server
            .post(&format!("/explain/{}", MockChatService::NAME))
            .json(&payload("missing", "EXPLAIN"))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test]
    async fn typed_endpoint_overrides_analysis_type() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let response = server
            .post(&format!("/refactor/{}", MockChatService::NAME))
            .json(&payload(&session_id, "EXPLAIN"))
            .await;
        response.assert_status_ok();

        let body = response.json::<AnalysisResponse>();
        assert_eq!(body.analysis_type, AnalysisType::Refactor);
        assert!(body.analysis.contains("=== MOCK ANALYSIS ==="));
        Ok(())
    }

    #[tokio::test]
    async fn stream_reports_missing_session() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server
            .post("/assist/openai/stream")
            .json(&payload("missing", "EXPLAIN"))
            .await;
        response.assert_status_ok();

        let text = response.text();
        assert!(text.contains("event: error"));
        assert!(text.contains("Session not found - missing"));
        assert!(!text.contains("event: content"));
        Ok(())
    }

    #[tokio::test]
    async fn stream_emits_content_then_complete() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;
        let session_id = create_session(&server).await;

        let response = server
            .post(&format!("/explain/{}/stream", MockChatService::NAME))
            .json(&payload(&session_id, "DEBUG"))
            .await;
        response.assert_status_ok();

        let text = response.text();
        let content = text.find("event: content").unwrap();
        let complete = text.find("event: complete").unwrap();
        assert!(content < complete);
        assert!(text.contains(&session_id));
        Ok(())
    }

    #[tokio::test]
    async fn services_list_implementations() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let services = server
            .get("/services")
            .await
            .json::<BTreeMap<String, String>>();
        assert_eq!(services.get(MockChatService::NAME).map(String::as_str), Some("Mock"));
        assert_eq!(services.len(), 3);

        let stats = server.get("/services/stats").await.json::<ServiceStats>();
        assert!(stats.has_services);
        assert_eq!(stats.available_services, 3);
        assert_eq!(stats.services.len(), 3);
        Ok(())
    }
}
