//! Chat services that run analyses against a provider.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};

use super::{
    AnalysisRequest, AnalysisResponse, AnalysisStrategy, AnalysisType, StrategyRegistry,
    StreamingAnalysisResponse,
};
use crate::provider::{AiService, AiServiceManager};
use crate::{Error, Result};

/// Tracing target for chat services.
const TRACING_TARGET: &str = "codelab_rig::analysis::chat";

/// Stream of analysis events, ending with a complete or error event.
pub type AnalysisStream = BoxStream<'static, StreamingAnalysisResponse>;

/// A service that can run code analyses.
#[async_trait]
pub trait AiChatService: Send + Sync {
    /// Registered name of the service, for example `OpenAIChatService`.
    fn name(&self) -> &str;

    /// Short description of the backing implementation.
    fn implementation(&self) -> String;

    /// The provider behind the service, if any.
    fn service(&self) -> Option<AiService>;

    /// Returns true if the service accepts requests.
    ///
    /// Provider services stay available without a configured key since a
    /// request may carry its own.
    fn is_available(&self) -> bool {
        true
    }

    /// Runs an analysis to completion.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;

    /// Runs an analysis and streams its output.
    ///
    /// Failures are reported as a final error event.
    async fn stream(&self, request: &AnalysisRequest) -> AnalysisStream;
}

/// Chat service backed by an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct ProviderChatService {
    service: AiService,
    manager: AiServiceManager,
    strategies: StrategyRegistry,
}

impl ProviderChatService {
    /// Creates a chat service for a provider.
    pub fn new(service: AiService, manager: AiServiceManager, strategies: StrategyRegistry) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            service = %service,
            strategies = %strategies.len(),
            "Chat service initialized"
        );
        Self {
            service,
            manager,
            strategies,
        }
    }

    /// Returns the registered name used for a provider.
    pub fn name_for(service: AiService) -> &'static str {
        match service {
            AiService::OpenAi => "OpenAIChatService",
            AiService::Groq => "GroqAIChatService",
        }
    }

    fn strategy(&self, analysis_type: AnalysisType) -> Result<&dyn AnalysisStrategy> {
        self.strategies.get(analysis_type).ok_or_else(|| {
            Error::provider(
                self.service,
                format!("No analysis strategy found for type: {analysis_type}"),
            )
        })
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        let strategy = self.strategy(request.analysis_type)?;
        let model = self
            .manager
            .model(self.service, request.api_key.as_deref())
            .await?;
        let messages = strategy.build_messages(request).into_messages();
        model.complete(&messages).await
    }

    async fn open_stream(
        &self,
        request: &AnalysisRequest,
    ) -> Result<crate::provider::CompletionStream> {
        let strategy = self.strategy(request.analysis_type)?;
        let model = self
            .manager
            .streaming_model(self.service, request.api_key.as_deref())
            .await?;
        let messages = strategy.build_messages(request).into_messages();
        model.stream(&messages).await
    }
}

#[async_trait]
impl AiChatService for ProviderChatService {
    fn name(&self) -> &str {
        Self::name_for(self.service)
    }

    fn implementation(&self) -> String {
        format!(
            "{} ({})",
            self.service.display_name(),
            self.manager.config().model(self.service)
        )
    }

    fn service(&self) -> Option<AiService> {
        Some(self.service)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        match self.generate(request).await {
            Ok(analysis) => Ok(AnalysisResponse::success(
                analysis,
                request.analysis_type,
                request.language.clone(),
            )),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    service = %self.service,
                    error = %err,
                    "Error analyzing code"
                );
                Err(Error::provider(
                    self.service,
                    format!("Failed to analyze code: {err}"),
                ))
            }
        }
    }

    async fn stream(&self, request: &AnalysisRequest) -> AnalysisStream {
        let analysis_type = request.analysis_type;
        let language = request.language.clone();

        let mut chunks = match self.open_stream(request).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    service = %self.service,
                    error = %err,
                    "Error setting up streaming analysis"
                );
                let event = StreamingAnalysisResponse::error(
                    format!("Failed to start streaming: {err}"),
                    Some(analysis_type),
                    Some(language),
                );
                return stream::iter([event]).boxed();
            }
        };

        let service = self.service;
        let events = async_stream::stream! {
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        yield StreamingAnalysisResponse::content(text, analysis_type, language.clone());
                    }
                    Err(err) => {
                        tracing::error!(
                            target: TRACING_TARGET,
                            service = %service,
                            error = %err,
                            "Streaming analysis failed"
                        );
                        yield StreamingAnalysisResponse::error(
                            format!("Streaming error: {err}"),
                            Some(analysis_type),
                            Some(language.clone()),
                        );
                        return;
                    }
                }
            }
            yield StreamingAnalysisResponse::complete(analysis_type, language);
        };
        events.boxed()
    }
}

/// Chat service with canned output, for tests and offline development.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone, Default)]
pub struct MockChatService {
    strategies: StrategyRegistry,
}

#[cfg(any(test, feature = "mock"))]
impl MockChatService {
    /// Registered name of the mock service.
    pub const NAME: &'static str = "MockAIChatService";

    /// Creates a mock service using the given strategies for descriptions.
    pub fn new(strategies: StrategyRegistry) -> Self {
        Self { strategies }
    }

    fn mock_analysis(&self, request: &AnalysisRequest) -> String {
        let mut analysis = format!(
            "=== MOCK ANALYSIS ===\n\nAnalysis Type: {}\nLanguage: {}\nCode Length: {} characters\n\n",
            request.analysis_type,
            request.language,
            request.code.chars().count()
        );
        if let Some(strategy) = self.strategies.get(request.analysis_type) {
            analysis.push_str("Strategy Description: ");
            analysis.push_str(strategy.description());
            analysis.push_str("\n\n");
        }

        match request.analysis_type {
            AnalysisType::Explain => {
                analysis.push_str("This is a mock explanation of the provided code.\n");
                analysis.push_str(&format!(
                    "The code appears to be a {} implementation.\n",
                    request.language
                ));
                analysis.push_str(
                    "In a real scenario, this would contain detailed analysis of the code's functionality.",
                );
            }
            AnalysisType::Refactor => analysis.push_str(
                "This is a mock refactoring suggestion.\n\
                 Consider improving code structure and readability.\n\
                 In a real scenario, this would contain specific refactoring recommendations.",
            ),
            AnalysisType::Debug => analysis.push_str(
                "This is a mock debugging analysis.\n\
                 Potential issues might be identified here.\n\
                 In a real scenario, this would contain specific debugging insights.",
            ),
            AnalysisType::Analyze => analysis.push_str(
                "This is a mock comprehensive analysis.\n\
                 It would include explanation, refactoring suggestions, and debugging insights.\n\
                 In a real scenario, this would be a detailed analysis of the code.",
            ),
            AnalysisType::WriteCode | AnalysisType::Followup => {}
        }
        analysis
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl AiChatService for MockChatService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn implementation(&self) -> String {
        "Mock".to_string()
    }

    fn service(&self) -> Option<AiService> {
        None
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        Ok(AnalysisResponse::success(
            self.mock_analysis(request),
            request.analysis_type,
            request.language.clone(),
        ))
    }

    async fn stream(&self, request: &AnalysisRequest) -> AnalysisStream {
        let analysis = self.mock_analysis(request);
        let mut events: Vec<StreamingAnalysisResponse> = analysis
            .split_inclusive('\n')
            .map(|line| {
                StreamingAnalysisResponse::content(line, request.analysis_type, &request.language)
            })
            .collect();
        events.push(StreamingAnalysisResponse::complete(
            request.analysis_type,
            &request.language,
        ));
        stream::iter(events).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StreamEventType;
    use crate::provider::{CompletionProvider, ProviderConfig};

    fn manager(provider: CompletionProvider) -> AiServiceManager {
        AiServiceManager::new(ProviderConfig::default().with_groq_api_key("gsk-test"))
            .unwrap()
            .with_mock_provider(provider)
    }

    fn request(analysis_type: AnalysisType) -> AnalysisRequest {
        AnalysisRequest::new("class A {}", analysis_type, "java", "s-1")
    }

    #[tokio::test]
    async fn provider_service_returns_model_output() {
        let service = ProviderChatService::new(
            AiService::Groq,
            manager(CompletionProvider::mock_with_reply("Looks fine.")),
            StrategyRegistry::default(),
        );
        assert_eq!(service.name(), "GroqAIChatService");

        let response = service.analyze(&request(AnalysisType::Debug)).await.unwrap();
        assert_eq!(response.analysis, "Looks fine.");
        assert_eq!(response.analysis_type, AnalysisType::Debug);
        assert!(response.success);
    }

    #[tokio::test]
    async fn provider_errors_are_wrapped() {
        let service = ProviderChatService::new(
            AiService::Groq,
            manager(CompletionProvider::mock_failing("rate limited")),
            StrategyRegistry::default(),
        );
        let err = service.analyze(&request(AnalysisType::Explain)).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to analyze code: rate limited");
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn missing_key_fails_analysis() {
        let service = ProviderChatService::new(
            AiService::OpenAi,
            manager(CompletionProvider::mock()),
            StrategyRegistry::default(),
        );
        let err = service.analyze(&request(AnalysisType::Explain)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to analyze code: OpenAI API key is required"
        );
    }

    #[tokio::test]
    async fn missing_strategy_fails_analysis() {
        let service = ProviderChatService::new(
            AiService::Groq,
            manager(CompletionProvider::mock()),
            StrategyRegistry::empty(),
        );
        let err = service.analyze(&request(AnalysisType::Refactor)).await.unwrap_err();
        assert!(err.to_string().contains("No analysis strategy found for type: REFACTOR"));
    }

    #[tokio::test]
    async fn stream_ends_with_complete() {
        let service = ProviderChatService::new(
            AiService::Groq,
            manager(CompletionProvider::mock_with_reply("one two")),
            StrategyRegistry::default(),
        );
        let events: Vec<_> = service.stream(&request(AnalysisType::Analyze)).await.collect().await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content.as_deref(), Some("one "));
        assert_eq!(events[2].event_type, StreamEventType::Complete);
        assert!(events[2].is_complete);
    }

    #[tokio::test]
    async fn stream_failures_become_error_events() {
        let service = ProviderChatService::new(
            AiService::Groq,
            manager(CompletionProvider::mock_failing("connection reset")),
            StrategyRegistry::default(),
        );
        let events: Vec<_> = service.stream(&request(AnalysisType::Debug)).await.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error.as_deref(), Some("Streaming error: connection reset"));

        let service = ProviderChatService::new(
            AiService::OpenAi,
            manager(CompletionProvider::mock()),
            StrategyRegistry::default(),
        );
        let events: Vec<_> = service.stream(&request(AnalysisType::Debug)).await.collect().await;
        assert_eq!(
            events[0].error.as_deref(),
            Some("Failed to start streaming: OpenAI API key is required")
        );
    }

    #[tokio::test]
    async fn mock_service_describes_the_request() {
        let service = MockChatService::default();
        let response = service.analyze(&request(AnalysisType::Explain)).await.unwrap();
        assert!(response.analysis.starts_with("=== MOCK ANALYSIS ===\n\nAnalysis Type: EXPLAIN\n"));
        assert!(response.analysis.contains("Code Length: 10 characters"));
        assert!(response.analysis.contains("The code appears to be a java implementation."));
    }
}
