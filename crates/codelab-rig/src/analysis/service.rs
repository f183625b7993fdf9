//! Session-aware code analysis.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;

use super::{AiChatService, AiServiceFactory, AnalysisRequest, AnalysisResponse, AnalysisStream};
use crate::session::{ChatMemory, Message, SessionManager};
use crate::{Error, Result};

/// Tracing target for code analysis.
const TRACING_TARGET: &str = "codelab_rig::analysis";

/// Runs analyses through a named chat service and keeps the session memory
/// up to date.
///
/// Prior turns of the session are replayed in front of the submitted code,
/// and each exchange is stored once the model answered.
#[derive(Debug, Clone)]
pub struct CodeAnalysisService {
    factory: AiServiceFactory,
    sessions: SessionManager,
}

impl CodeAnalysisService {
    /// Creates the service.
    pub fn new(factory: AiServiceFactory, sessions: SessionManager) -> Self {
        Self { factory, sessions }
    }

    /// Returns the session registry.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Returns the service factory.
    pub fn factory(&self) -> &AiServiceFactory {
        &self.factory
    }

    /// Analyzes code with the named service.
    pub async fn analyze_code(
        &self,
        request: &AnalysisRequest,
        service_name: &str,
    ) -> Result<AnalysisResponse> {
        tracing::debug!(
            target: TRACING_TARGET,
            analysis_type = %request.analysis_type,
            service = %service_name,
            session_id = %request.session_id,
            "Analyzing code"
        );

        let (service, memory) = self.prepare(request, service_name).await?;
        let enhanced = enhance_with_memory(request, &memory).await;

        let mut response = service.analyze(&enhanced).await.inspect_err(|err| {
            tracing::error!(
                target: TRACING_TARGET,
                session_id = %request.session_id,
                error = %err,
                "AI service failed to analyze code"
            );
        })?;

        tracing::info!(
            target: TRACING_TARGET,
            session_id = %request.session_id,
            response_len = %response.analysis.len(),
            "LLM response received"
        );

        remember(&memory, &request.code, &response.analysis).await;
        let messages = memory.len().await + 1;
        response.session_id = Some(request.session_id.clone());
        response.conversation_context = Some(format!(
            "Session: {} | Messages in memory: {messages}",
            request.session_id,
        ));
        Ok(response)
    }

    /// Streams an analysis with the named service.
    ///
    /// The session and service are checked before streaming starts. The
    /// streamed text is stored in the session once the stream ends.
    pub async fn stream_analysis(
        &self,
        request: &AnalysisRequest,
        service_name: &str,
    ) -> Result<AnalysisStream> {
        tracing::debug!(
            target: TRACING_TARGET,
            analysis_type = %request.analysis_type,
            service = %service_name,
            session_id = %request.session_id,
            "Streaming analysis"
        );

        let (service, memory) = self.prepare(request, service_name).await?;
        let enhanced = enhance_with_memory(request, &memory).await;
        let mut events = service.stream(&enhanced).await;

        let session_id = request.session_id.clone();
        let code = request.code.clone();
        let stream = async_stream::stream! {
            let mut full_response = String::new();
            while let Some(event) = events.next().await {
                if let Some(content) = &event.content {
                    full_response.push_str(content);
                }
                yield event.with_session_id(session_id.clone());
            }

            if !full_response.is_empty() {
                tracing::info!(
                    target: TRACING_TARGET,
                    session_id = %session_id,
                    response_len = %full_response.len(),
                    "LLM streaming response received"
                );
                remember(&memory, &code, &full_response).await;
            }
        };
        Ok(stream.boxed())
    }

    /// Returns every available chat service keyed by name.
    pub fn available_services(&self) -> BTreeMap<String, Arc<dyn AiChatService>> {
        self.factory.available_services()
    }

    /// Returns true if at least one chat service is available.
    pub fn has_available_service(&self) -> bool {
        self.factory.has_available_services()
    }

    /// Returns the number of available chat services.
    pub fn available_service_count(&self) -> usize {
        self.factory.available_service_count()
    }

    async fn prepare(
        &self,
        request: &AnalysisRequest,
        service_name: &str,
    ) -> Result<(Arc<dyn AiChatService>, ChatMemory)> {
        let not_found = || Error::session(format!("Session not found: {}", request.session_id));
        if !self.sessions.session_exists(&request.session_id).await {
            return Err(not_found());
        }

        let service = self.factory.service(service_name)?;
        tracing::info!(
            target: TRACING_TARGET,
            service = %service.name(),
            session_id = %request.session_id,
            "Using AI service"
        );

        let memory = self
            .sessions
            .session_memory(&request.session_id)
            .await
            .ok_or_else(not_found)?;
        Ok((service, memory))
    }
}

/// Prefixes the code with the session transcript, if there is one.
async fn enhance_with_memory(request: &AnalysisRequest, memory: &ChatMemory) -> AnalysisRequest {
    let messages = memory.messages().await;
    if messages.is_empty() {
        tracing::info!(
            target: TRACING_TARGET,
            analysis_type = %request.analysis_type,
            language = %request.language,
            session_id = %request.session_id,
            "No memory context available"
        );
        return request.clone();
    }

    let mut code = String::from("// Previous conversation context:\n");
    for message in &messages {
        code.push_str("// ");
        code.push_str(message.role().transcript_label());
        code.push_str(": ");
        code.push_str(message.content());
        code.push('\n');
    }
    code.push_str("\n// Current request:\n");
    code.push_str(&request.code);

    tracing::info!(
        target: TRACING_TARGET,
        analysis_type = %request.analysis_type,
        session_id = %request.session_id,
        memory = %messages.len(),
        "Request enhanced with memory"
    );

    AnalysisRequest {
        code,
        ..request.clone()
    }
}

async fn remember(memory: &ChatMemory, code: &str, analysis: &str) {
    let before = memory.len().await;
    memory.add(Message::user(code)).await;
    memory.add(Message::assistant(analysis)).await;
    let after = memory.len().await;
    tracing::debug!(
        target: TRACING_TARGET,
        before = %before,
        after = %after,
        "Memory updated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisType, MockChatService, StreamEventType};

    async fn service() -> (CodeAnalysisService, String) {
        let factory = AiServiceFactory::new().with_service(MockChatService::default());
        let sessions = SessionManager::new();
        let session_id = sessions.create_session().await;
        (CodeAnalysisService::new(factory, sessions), session_id)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn analysis_futures_can_cross_threads() {
        let (service, session_id) = service().await;
        let request = AnalysisRequest::new("x", AnalysisType::Explain, "java", session_id);

        let analysis = service.analyze_code(&request, MockChatService::NAME);
        assert_send(&analysis);
        assert!(analysis.await.is_ok());

        let stream = service.stream_analysis(&request, MockChatService::NAME);
        assert_send(&stream);
        assert!(stream.await.is_ok());
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let (service, _) = service().await;
        let request = AnalysisRequest::new("x", AnalysisType::Explain, "java", "nope");
        let err = service
            .analyze_code(&request, MockChatService::NAME)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Session not found: nope");
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let (service, session_id) = service().await;
        let request = AnalysisRequest::new("x", AnalysisType::Explain, "java", session_id);
        let err = service.analyze_code(&request, "openai").await.unwrap_err();
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn analysis_is_stored_in_memory() {
        let (service, session_id) = service().await;
        let request =
            AnalysisRequest::new("int a = 1;", AnalysisType::Explain, "java", &session_id);

        let response = service
            .analyze_code(&request, MockChatService::NAME)
            .await
            .unwrap();
        assert_eq!(response.session_id.as_deref(), Some(session_id.as_str()));
        assert_eq!(
            response.conversation_context.as_deref(),
            Some(format!("Session: {session_id} | Messages in memory: 3").as_str())
        );

        let memory = service.sessions().session_memory(&session_id).await.unwrap();
        let messages = memory.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content(), "int a = 1;");
    }

    #[tokio::test]
    async fn follow_up_replays_the_transcript() {
        let (service, session_id) = service().await;
        let first = AnalysisRequest::new("int a = 1;", AnalysisType::Explain, "java", &session_id);
        service.analyze_code(&first, MockChatService::NAME).await.unwrap();

        let memory = service.sessions().session_memory(&session_id).await.unwrap();
        let second =
            AnalysisRequest::new("why?", AnalysisType::Followup, "java", &session_id);
        let enhanced = enhance_with_memory(&second, &memory).await;

        assert!(enhanced.code.starts_with("// Previous conversation context:\n// USER: int a = 1;\n// AI: "));
        assert!(enhanced.code.ends_with("\n// Current request:\nwhy?"));
        assert_eq!(enhanced.analysis_type, AnalysisType::Followup);
    }

    #[tokio::test]
    async fn streamed_text_is_stored_after_completion() {
        let (service, session_id) = service().await;
        let request = AnalysisRequest::new("x", AnalysisType::Debug, "rust", &session_id);

        let events: Vec<_> = service
            .stream_analysis(&request, MockChatService::NAME)
            .await
            .unwrap()
            .collect()
            .await;

        let last = events.last().unwrap();
        assert_eq!(last.event_type, StreamEventType::Complete);
        assert!(events.iter().all(|e| e.session_id.as_deref() == Some(session_id.as_str())));

        let streamed: String = events.iter().filter_map(|e| e.content.clone()).collect();
        let memory = service.sessions().session_memory(&session_id).await.unwrap();
        let messages = memory.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content(), streamed);
    }
}
