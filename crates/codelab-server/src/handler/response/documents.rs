//! Document RAG responses.

use codelab_rig::rag::ChatMessage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Conversation transcript of a session.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    pub session_id: String,
    /// Questions and answers, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Outcome of clearing a transcript.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCleared {
    pub session_id: String,
    /// False if the session had no transcript.
    pub success: bool,
    pub message: String,
}
