//! Health check responses.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status reported by every healthy module.
pub const STATUS_UP: &str = "UP";

/// Version reported by the placeholder modules.
pub const PLACEHOLDER_VERSION: &str = "1.0.0";

/// Health of a module.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    /// Always `UP` while the server answers.
    pub status: String,
    /// Module name.
    pub service: String,
    #[schemars(with = "String")]
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServiceHealth {
    /// Creates an `UP` status for the named module.
    pub fn up(service: impl Into<String>) -> Self {
        Self {
            status: STATUS_UP.to_owned(),
            service: service.into(),
            timestamp: Timestamp::now(),
            version: None,
            description: None,
        }
    }

    /// Adds the version and a description of the module.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.version = Some(PLACEHOLDER_VERSION.to_owned());
        self.description = Some(description.into());
        self
    }
}
