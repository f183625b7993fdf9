//! Session and service statistics responses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of a session operation.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Affected session, absent for bulk operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Human readable outcome.
    pub message: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Number of sessions after the operation.
    pub active_session_count: usize,
}

impl SessionResponse {
    /// Creates a successful response.
    pub fn success(message: impl Into<String>, active_session_count: usize) -> Self {
        Self {
            session_id: None,
            message: message.into(),
            success: true,
            active_session_count,
        }
    }

    /// Creates a failed response.
    pub fn failure(message: impl Into<String>, active_session_count: usize) -> Self {
        Self {
            success: false,
            ..Self::success(message, active_session_count)
        }
    }

    /// Sets the affected session.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Active sessions.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub active_session_count: usize,
    pub active_session_ids: Vec<String>,
}

/// Available chat services.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Number of services with a configured key.
    pub available_services: usize,
    /// True if at least one service is available.
    pub has_services: bool,
    /// Names of the available services.
    pub services: Vec<String>,
    pub active_session_count: usize,
}
