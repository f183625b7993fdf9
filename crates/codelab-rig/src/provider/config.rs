//! Configuration for AI chat and embedding providers.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::AiService;
use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";
    pub const GROQ_MODEL: &str = "llama3-8b-8192";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
    pub const OPENAI_TEMPERATURE: f32 = 0.7;
    pub const GROQ_TEMPERATURE: f32 = 0.3;
    pub const TIMEOUT_SECS: u64 = 60;
    pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
}

/// Credentials and model settings for the chat providers.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct ProviderConfig {
    /// OpenAI API key, used when a request carries none.
    #[serde(skip_serializing)]
    #[cfg_attr(
        feature = "config",
        arg(long = "openai-api-key", env = "OPENAI_API_KEY", hide_env_values = true)
    )]
    pub openai_api_key: Option<String>,

    /// Groq API key, used when a request carries none.
    #[serde(skip_serializing)]
    #[cfg_attr(
        feature = "config",
        arg(long = "groq-api-key", env = "GROK_API_KEY", hide_env_values = true)
    )]
    pub groq_api_key: Option<String>,

    /// OpenAI chat model.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_MODEL", default_value = defaults::OPENAI_MODEL)
    )]
    pub openai_model: String,

    /// Groq chat model.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "GROQ_MODEL", default_value = defaults::GROQ_MODEL)
    )]
    pub groq_model: String,

    /// OpenAI API base URL.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_BASE_URL", default_value = defaults::OPENAI_BASE_URL)
    )]
    pub openai_base_url: String,

    /// Groq API base URL.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "GROQ_BASE_URL", default_value = defaults::GROQ_BASE_URL)
    )]
    pub groq_base_url: String,

    /// Sampling temperature for OpenAI.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_TEMPERATURE", default_value_t = defaults::OPENAI_TEMPERATURE)
    )]
    pub openai_temperature: f32,

    /// Sampling temperature for Groq.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "GROQ_TEMPERATURE", default_value_t = defaults::GROQ_TEMPERATURE)
    )]
    pub groq_temperature: f32,

    /// Timeout of a provider request in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "ai-timeout", env = "AI_TIMEOUT_SECS", default_value_t = defaults::TIMEOUT_SECS)
    )]
    pub timeout_secs: u64,

    /// OpenAI embedding model.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_EMBEDDING_MODEL", default_value = defaults::EMBEDDING_MODEL)
    )]
    pub embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            groq_api_key: None,
            openai_model: defaults::OPENAI_MODEL.to_string(),
            groq_model: defaults::GROQ_MODEL.to_string(),
            openai_base_url: defaults::OPENAI_BASE_URL.to_string(),
            groq_base_url: defaults::GROQ_BASE_URL.to_string(),
            openai_temperature: defaults::OPENAI_TEMPERATURE,
            groq_temperature: defaults::GROQ_TEMPERATURE,
            timeout_secs: defaults::TIMEOUT_SECS,
            embedding_model: defaults::EMBEDDING_MODEL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Sets the OpenAI API key.
    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Sets the Groq API key.
    pub fn with_groq_api_key(mut self, key: impl Into<String>) -> Self {
        self.groq_api_key = Some(key.into());
        self
    }

    /// Returns the configured, non-blank API key of a service.
    pub fn api_key(&self, service: AiService) -> Option<&str> {
        let key = match service {
            AiService::OpenAi => self.openai_api_key.as_deref(),
            AiService::Groq => self.groq_api_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    /// Returns the chat model of a service.
    pub fn model(&self, service: AiService) -> &str {
        match service {
            AiService::OpenAi => self.openai_model.trim(),
            AiService::Groq => self.groq_model.trim(),
        }
    }

    /// Returns the API base URL of a service without a trailing slash.
    pub fn base_url(&self, service: AiService) -> &str {
        match service {
            AiService::OpenAi => self.openai_base_url.trim_end_matches('/'),
            AiService::Groq => self.groq_base_url.trim_end_matches('/'),
        }
    }

    /// Returns the sampling temperature of a service.
    pub fn temperature(&self, service: AiService) -> f32 {
        match service {
            AiService::OpenAi => self.openai_temperature,
            AiService::Groq => self.groq_temperature,
        }
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates option ranges and URLs.
    pub fn validate(&self) -> Result<()> {
        for service in [AiService::OpenAi, AiService::Groq] {
            let temperature = self.temperature(service);
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::config(format!(
                    "{service} temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
            let base_url = self.base_url(service);
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(Error::config(format!(
                    "{service} base URL must start with http:// or https://, got {base_url}"
                )));
            }
            if self.model(service).is_empty() {
                return Err(Error::config(format!("{service} model must not be empty")));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("AI timeout must be at least one second"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "***"))
            .field("openai_model", &self.openai_model)
            .field("groq_model", &self.groq_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("groq_base_url", &self.groq_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}
