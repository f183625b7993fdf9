//! Lookup of chat services by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use strum::IntoEnumIterator;

use super::{AiChatService, ProviderChatService, StrategyRegistry};
use crate::provider::{AiService, AiServiceManager};
use crate::{Error, Result};

/// Tracing target for the service factory.
const TRACING_TARGET: &str = "codelab_rig::analysis::factory";

/// Registry of chat services.
///
/// Services are found by their registered name, for example
/// `GroqAIChatService`, or by provider alias such as `groq`. Both lookups
/// ignore case.
#[derive(Clone, Default)]
pub struct AiServiceFactory {
    services: BTreeMap<String, Arc<dyn AiChatService>>,
}

impl AiServiceFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with a chat service per provider.
    pub fn from_manager(manager: &AiServiceManager, strategies: &StrategyRegistry) -> Self {
        let factory = AiService::iter().fold(Self::new(), |factory, service| {
            factory.with_service(ProviderChatService::new(
                service,
                manager.clone(),
                strategies.clone(),
            ))
        });

        tracing::info!(
            target: TRACING_TARGET,
            services = ?factory.service_names(),
            "AI service factory initialized"
        );
        factory
    }

    /// Registers a service under its name.
    pub fn with_service(mut self, service: impl AiChatService + 'static) -> Self {
        self.services
            .insert(service.name().to_string(), Arc::new(service));
        self
    }

    /// Returns the service registered under `name` or a provider alias.
    pub fn service(&self, name: &str) -> Result<Arc<dyn AiChatService>> {
        let name = name.trim();
        let by_name = self
            .services
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .map(|(_, service)| service);

        let found = by_name.or_else(|| {
            let alias = name.parse::<AiService>().ok()?;
            self.services
                .values()
                .find(|service| service.service() == Some(alias))
        });

        match found.filter(|service| service.is_available()) {
            Some(service) => Ok(service.clone()),
            None => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    requested = %name,
                    "Requested AI service is not available"
                );
                Err(Error::service_unavailable(format!(
                    "Service '{name}' is not available. Available services: [{}]",
                    self.service_names().join(", ")
                )))
            }
        }
    }

    /// Returns every available service keyed by name.
    pub fn available_services(&self) -> BTreeMap<String, Arc<dyn AiChatService>> {
        self.services
            .iter()
            .filter(|(_, service)| service.is_available())
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect()
    }

    /// Returns the names of the available services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|(_, service)| service.is_available())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns true if at least one service is available.
    pub fn has_available_services(&self) -> bool {
        self.available_service_count() > 0
    }

    /// Returns the number of available services.
    pub fn available_service_count(&self) -> usize {
        self.services.values().filter(|s| s.is_available()).count()
    }
}

impl std::fmt::Debug for AiServiceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiServiceFactory")
            .field("services", &self.service_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MockChatService;
    use crate::provider::ProviderConfig;

    fn factory() -> AiServiceFactory {
        let manager = AiServiceManager::new(ProviderConfig::default()).unwrap();
        AiServiceFactory::from_manager(&manager, &StrategyRegistry::default())
    }

    #[test]
    fn registers_one_service_per_provider() {
        let factory = factory();
        assert_eq!(factory.available_service_count(), 2);
        assert_eq!(
            factory.service_names(),
            ["GroqAIChatService", "OpenAIChatService"]
        );
    }

    #[test]
    fn resolves_names_and_aliases() {
        let factory = factory();
        assert_eq!(factory.service("OpenAIChatService").unwrap().name(), "OpenAIChatService");
        assert_eq!(factory.service("groqaichatservice").unwrap().name(), "GroqAIChatService");
        assert_eq!(factory.service("groq").unwrap().name(), "GroqAIChatService");
        assert_eq!(factory.service("OPENAI").unwrap().name(), "OpenAIChatService");
    }

    #[test]
    fn unknown_service_lists_alternatives() {
        let err = factory().service("claude").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Service 'claude' is not available. Available services: [GroqAIChatService, OpenAIChatService]"
        );
        assert!(err.is_service_error());
    }

    #[test]
    fn mock_service_can_be_added() {
        let factory = AiServiceFactory::new().with_service(MockChatService::default());
        assert!(factory.has_available_services());
        assert!(factory.service("MockAIChatService").is_ok());
        assert!(factory.service("openai").is_err());
    }
}
