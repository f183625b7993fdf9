//! Cached construction of completion providers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use reqwest::Client;
use sha2::{Digest, Sha256};
use strum::IntoEnumIterator;
use tokio::sync::RwLock;

use super::{AiService, CompletionProvider, ProviderConfig};
use crate::{Error, Result};

/// Tracing target for provider construction.
const TRACING_TARGET: &str = "codelab_rig::provider::manager";

/// Builds and caches completion providers per service and API key.
///
/// A request may carry its own API key, which takes precedence over the
/// configured one. Clients are cached by service, mode and a fingerprint
/// of the key, so keys never appear in the cache.
#[derive(Clone)]
pub struct AiServiceManager {
    config: Arc<ProviderConfig>,
    http: Client,
    providers: Arc<RwLock<HashMap<String, CompletionProvider>>>,
    #[cfg(any(test, feature = "mock"))]
    mock: Option<CompletionProvider>,
}

impl AiServiceManager {
    /// Creates a manager from the provider configuration.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        // No overall timeout on the client: streamed answers may run longer.
        let http = Client::builder()
            .connect_timeout(config.timeout())
            .read_timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        tracing::info!(
            target: TRACING_TARGET,
            openai = %config.api_key(AiService::OpenAi).is_some(),
            groq = %config.api_key(AiService::Groq).is_some(),
            "AI service manager initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            http,
            providers: Arc::default(),
            #[cfg(any(test, feature = "mock"))]
            mock: None,
        })
    }

    /// Returns a manager whose every model is the given provider.
    ///
    /// Keys are still required, so availability checks behave as in
    /// production.
    #[cfg(any(test, feature = "mock"))]
    pub fn with_mock_provider(mut self, provider: CompletionProvider) -> Self {
        self.mock = Some(provider);
        self
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Returns a provider for blocking completions.
    pub async fn model(
        &self,
        service: AiService,
        api_key: Option<&str>,
    ) -> Result<CompletionProvider> {
        self.provider(service, api_key, false).await
    }

    /// Returns a provider for streaming completions.
    pub async fn streaming_model(
        &self,
        service: AiService,
        api_key: Option<&str>,
    ) -> Result<CompletionProvider> {
        self.provider(service, api_key, true).await
    }

    /// Returns true if a configured key exists for the service.
    pub fn is_service_available(&self, service: AiService) -> bool {
        self.config.api_key(service).is_some()
    }

    /// Returns the availability of every service, keyed by display name.
    pub fn available_services(&self) -> BTreeMap<String, bool> {
        AiService::iter()
            .map(|service| {
                (
                    service.display_name().to_string(),
                    self.is_service_available(service),
                )
            })
            .collect()
    }

    /// Returns the number of cached providers.
    pub async fn cached_providers(&self) -> usize {
        self.providers.read().await.len()
    }

    async fn provider(
        &self,
        service: AiService,
        api_key: Option<&str>,
        streaming: bool,
    ) -> Result<CompletionProvider> {
        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| self.config.api_key(service))
            .ok_or_else(|| Error::config(service.missing_key_message()))?;

        let cache_key = format!("{}{}", service.cache_prefix(streaming), fingerprint(key));
        if let Some(provider) = self.providers.read().await.get(&cache_key) {
            return Ok(provider.clone());
        }

        let mut providers = self.providers.write().await;
        if let Some(provider) = providers.get(&cache_key) {
            return Ok(provider.clone());
        }

        let provider = self.build(service, key, streaming);
        tracing::debug!(
            target: TRACING_TARGET,
            provider = %service.id(),
            model = %provider.model_name(),
            streaming = %streaming,
            "Created completion provider"
        );
        providers.insert(cache_key, provider.clone());
        Ok(provider)
    }

    fn build(&self, service: AiService, key: &str, streaming: bool) -> CompletionProvider {
        #[cfg(any(test, feature = "mock"))]
        if let Some(mock) = &self.mock {
            return mock.clone();
        }

        CompletionProvider::new(
            self.http.clone(),
            service,
            self.config.base_url(service),
            key,
            self.config.model(service),
            self.config.temperature(service),
            (!streaming).then(|| self.config.timeout()),
        )
    }
}

/// Short, stable fingerprint of an API key.
fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

impl std::fmt::Debug for AiServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiServiceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
