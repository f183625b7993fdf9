//! Path parameter types for HTTP handlers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Path parameters selecting an AI chat service.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePathParams {
    /// Registered service name or provider alias, e.g. `openai`.
    pub service: String,
}

/// Path parameters for session operations.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPathParams {
    /// Identifier returned when the session was created.
    pub session_id: String,
}
