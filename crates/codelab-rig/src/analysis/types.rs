//! Request and response types of code analysis.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::AnalysisType;

/// A code analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Source code, requirements or follow-up question.
    pub code: String,
    /// Kind of analysis.
    pub analysis_type: AnalysisType,
    /// Programming language of the code.
    pub language: String,
    /// Session the request belongs to.
    pub session_id: String,
    /// Provider key overriding the configured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AnalysisRequest {
    /// Creates a request without an API key override.
    pub fn new(
        code: impl Into<String>,
        analysis_type: AnalysisType,
        language: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            analysis_type,
            language: language.into(),
            session_id: session_id.into(),
            api_key: None,
        }
    }

    /// Sets the API key override.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Result of a blocking analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Model output.
    pub analysis: String,
    /// Kind of analysis performed.
    pub analysis_type: AnalysisType,
    /// Programming language of the code.
    pub language: String,
    /// Whether the analysis succeeded.
    pub success: bool,
    /// Completion time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Session the analysis belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Short description of the conversation state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<String>,
}

impl AnalysisResponse {
    /// Creates a successful response.
    pub fn success(
        analysis: impl Into<String>,
        analysis_type: AnalysisType,
        language: impl Into<String>,
    ) -> Self {
        Self {
            analysis: analysis.into(),
            analysis_type,
            language: language.into(),
            success: true,
            timestamp: Timestamp::now().as_millisecond(),
            session_id: None,
            conversation_context: None,
        }
    }

    /// Creates a failed response carrying the error text as its analysis.
    pub fn failure(
        analysis: impl Into<String>,
        analysis_type: AnalysisType,
        language: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            ..Self::success(analysis, analysis_type, language)
        }
    }

    /// Sets the session the response belongs to.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Kind of a streaming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventType {
    /// A chunk of generated text.
    Content,
    /// The stream finished successfully.
    Complete,
    /// The stream failed.
    Error,
}

impl StreamEventType {
    /// Returns the SSE event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// One event of a streaming analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamingAnalysisResponse {
    /// Kind of event.
    pub event_type: StreamEventType,
    /// Text chunk, for content events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Kind of analysis performed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<AnalysisType>,
    /// Programming language of the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Whether this is the last event.
    pub is_complete: bool,
    /// Error message, for error events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// False for error events.
    pub success: bool,
    /// Session the stream belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl StreamingAnalysisResponse {
    /// Creates a content chunk event.
    pub fn content(
        content: impl Into<String>,
        analysis_type: AnalysisType,
        language: impl Into<String>,
    ) -> Self {
        Self {
            event_type: StreamEventType::Content,
            content: Some(content.into()),
            analysis_type: Some(analysis_type),
            language: Some(language.into()),
            is_complete: false,
            error: None,
            success: true,
            session_id: None,
        }
    }

    /// Creates a completion event.
    pub fn complete(analysis_type: AnalysisType, language: impl Into<String>) -> Self {
        Self {
            event_type: StreamEventType::Complete,
            content: None,
            analysis_type: Some(analysis_type),
            language: Some(language.into()),
            is_complete: true,
            error: None,
            success: true,
            session_id: None,
        }
    }

    /// Creates an error event.
    pub fn error(
        message: impl Into<String>,
        analysis_type: Option<AnalysisType>,
        language: Option<String>,
    ) -> Self {
        Self {
            event_type: StreamEventType::Error,
            content: None,
            analysis_type,
            language,
            is_complete: true,
            error: Some(message.into()),
            success: false,
            session_id: None,
        }
    }

    /// Attaches the session identifier.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let request: AnalysisRequest = serde_json::from_value(json!({
            "code": "int x;",
            "analysisType": "EXPLAIN",
            "language": "java",
            "sessionId": "s-1",
        }))
        .unwrap();
        assert_eq!(request.analysis_type, AnalysisType::Explain);
        assert_eq!(request.api_key, None);
    }

    #[test]
    fn stream_events_serialize_flags() {
        let event = StreamingAnalysisResponse::content("hi", AnalysisType::Debug, "go")
            .with_session_id("s");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventType"], json!("content"));
        assert_eq!(value["isComplete"], json!(false));
        assert_eq!(value["sessionId"], json!("s"));

        let error = StreamingAnalysisResponse::error("boom", None, None);
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["eventType"], json!("error"));
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["isComplete"], json!(true));
    }
}
