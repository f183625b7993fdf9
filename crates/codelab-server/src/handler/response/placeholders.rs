//! Responses of the not yet implemented chat and generator features.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of every placeholder response.
const STATUS_SUCCESS: &str = "success";

/// Acknowledgement returned by a placeholder endpoint.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    /// Always `success`.
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<Timestamp>,
    /// Chat history, always empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_tests: Option<String>,
}

impl Placeholder {
    fn new(message: &str) -> Self {
        Self {
            status: STATUS_SUCCESS.to_owned(),
            message: message.to_owned(),
            timestamp: None,
            history: None,
            generated_code: None,
            generated_tests: None,
        }
    }

    /// Acknowledges a chat message.
    pub fn chat_message() -> Self {
        Self {
            timestamp: Some(Timestamp::now()),
            ..Self::new("AI Chat feature coming soon!")
        }
    }

    /// Returns the empty chat history.
    pub fn chat_history() -> Self {
        Self {
            history: Some(Vec::new()),
            ..Self::new("Chat history feature coming soon!")
        }
    }

    /// Acknowledges a code generation request.
    pub fn generated_code() -> Self {
        Self {
            timestamp: Some(Timestamp::now()),
            generated_code: Some("// Placeholder for generated code".to_owned()),
            ..Self::new("Code generation feature coming soon!")
        }
    }

    /// Acknowledges a test generation request.
    pub fn generated_tests() -> Self {
        Self {
            timestamp: Some(Timestamp::now()),
            generated_tests: Some("// Placeholder for generated tests".to_owned()),
            ..Self::new("Test generation feature coming soon!")
        }
    }
}
