//! Supported AI chat services.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

/// An OpenAI-compatible chat completion service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum AiService {
    /// OpenAI chat completions.
    #[strum(serialize = "openai", to_string = "OpenAI")]
    OpenAi,
    /// Groq's OpenAI-compatible endpoint.
    #[strum(serialize = "groq", to_string = "Groq")]
    Groq,
}

impl AiService {
    /// Returns the lowercase identifier used in configuration and routes.
    pub fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
        }
    }

    /// Returns the human readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Groq => "Groq",
        }
    }

    /// Prefix of the cache key for clients of this service.
    pub(crate) fn cache_prefix(self, streaming: bool) -> &'static str {
        match (self, streaming) {
            (Self::OpenAi, false) => "openai-",
            (Self::OpenAi, true) => "openai-streaming-",
            (Self::Groq, false) => "groq-",
            (Self::Groq, true) => "groq-streaming-",
        }
    }

    /// Error message used when neither the request nor the configuration
    /// carries a key for this service.
    pub(crate) fn missing_key_message(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI API key is required",
            Self::Groq => "Groq API key is required",
        }
    }

    /// Parses a service name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        name.trim()
            .parse()
            .map_err(|_| Error::config(format!("Unknown AI service: {name}")))
    }
}
