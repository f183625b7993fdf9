//! Application state and dependency injection.

mod config;

use codelab_rig::analysis::{AiServiceFactory, CodeAnalysisService, StrategyRegistry};
use codelab_rig::embedding::EmbeddingProvider;
use codelab_rig::provider::AiServiceManager;
use codelab_rig::rag::RagService;
use codelab_rig::session::SessionManager;
use codelab_vector::VectorStore;

pub use crate::service::config::{ServiceConfig, VectorBackend, VectorConfig};
pub use crate::{Error, Result};

/// Tracing target for service state construction.
const TRACING_TARGET: &str = "codelab_server::service";

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    analysis: CodeAnalysisService,
    sessions: SessionManager,
    rag: RagService,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Builds the AI providers, connects the vector store and stores the
    /// intent embeddings.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let manager = AiServiceManager::new(config.provider.clone())?;
        let factory = AiServiceFactory::from_manager(&manager, &StrategyRegistry::default());
        let sessions = SessionManager::new();
        let analysis = CodeAnalysisService::new(factory, sessions.clone());

        let http = manager.http_client().clone();
        let embedder = EmbeddingProvider::from_config(http, &config.provider)?;
        let store = VectorStore::new(config.vector.store_config()?).await?;
        let rag = RagService::new(store, embedder, manager, config.rag.clone());
        let intents = rag.initialize().await;

        tracing::info!(
            target: TRACING_TARGET,
            services = %analysis.available_service_count(),
            vector_backend = ?config.vector.backend,
            intents = %intents,
            "Service state initialized"
        );

        Ok(Self {
            analysis,
            sessions,
            rag,
        })
    }

    /// Returns a state backed by canned completions, deterministic
    /// embeddings and the in-memory vector store.
    ///
    /// Every provider answers with `reply`; the factory additionally holds
    /// the `MockAIChatService`.
    #[cfg(any(test, feature = "mock"))]
    pub async fn mock(reply: &str) -> Result<Self> {
        use codelab_rig::provider::{CompletionProvider, ProviderConfig};

        let provider = ProviderConfig::default()
            .with_openai_api_key("sk-test")
            .with_groq_api_key("gsk-test");
        let manager = AiServiceManager::new(provider)?
            .with_mock_provider(CompletionProvider::mock_with_reply(reply));
        Self::mock_with_manager(manager).await
    }

    /// Returns a mock state whose providers are configured by `manager`.
    #[cfg(any(test, feature = "mock"))]
    pub async fn mock_with_manager(manager: AiServiceManager) -> Result<Self> {
        use codelab_rig::analysis::MockChatService;
        use codelab_rig::rag::RagConfig;

        let strategies = StrategyRegistry::default();
        let factory = AiServiceFactory::from_manager(&manager, &strategies)
            .with_service(MockChatService::new(strategies));
        let sessions = SessionManager::new();
        let analysis = CodeAnalysisService::new(factory, sessions.clone());

        let rag = RagService::new(
            VectorStore::memory(),
            EmbeddingProvider::mock(),
            manager,
            RagConfig::default(),
        );
        rag.initialize().await;

        Ok(Self {
            analysis,
            sessions,
            rag,
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(analysis: CodeAnalysisService);
impl_di!(sessions: SessionManager);
impl_di!(rag: RagService);
