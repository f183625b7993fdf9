//! Code assistant request types.

use codelab_rig::analysis::{AnalysisRequest, AnalysisType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handler::{ErrorKind, Result};

/// Request payload for code analysis and assistance.
#[must_use]
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalysis {
    /// Source code, requirements or a follow-up question.
    #[validate(length(min = 1, message = "Code cannot be blank"))]
    pub code: String,
    /// Kind of analysis. Ignored by endpoints that imply one.
    pub analysis_type: Option<AnalysisType>,
    /// Programming language of the code.
    #[validate(length(min = 1, message = "Language cannot be blank"))]
    pub language: String,
    /// Session created through `POST /sessions`.
    #[validate(length(min = 1, message = "Session ID cannot be blank"))]
    pub session_id: String,
    /// Provider key used instead of the configured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl CodeAnalysis {
    /// Returns the effective analysis type: `forced` if given, else the
    /// requested one.
    pub fn analysis_type_or(&self, forced: Option<AnalysisType>) -> Option<AnalysisType> {
        forced.or(self.analysis_type)
    }

    /// Converts this request into an analysis request.
    ///
    /// Fails with a bad request when neither `forced` nor the payload names
    /// an analysis type.
    pub fn into_analysis_request(
        self,
        forced: Option<AnalysisType>,
    ) -> Result<AnalysisRequest> {
        let analysis_type = self.analysis_type_or(forced).ok_or_else(|| {
            ErrorKind::BadRequest
                .with_message("Analysis type cannot be null")
                .with_resource("request")
        })?;

        let request = AnalysisRequest::new(self.code, analysis_type, self.language, self.session_id);
        Ok(match self.api_key.filter(|key| !key.trim().is_empty()) {
            Some(api_key) => request.with_api_key(api_key),
            None => request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CodeAnalysis {
        CodeAnalysis {
            code: "class A {}".to_owned(),
            analysis_type: Some(AnalysisType::Explain),
            language: "java".to_owned(),
            session_id: "s-1".to_owned(),
            api_key: None,
        }
    }

    #[test]
    fn forced_type_wins() {
        let request = payload()
            .into_analysis_request(Some(AnalysisType::Followup))
            .unwrap();
        assert_eq!(request.analysis_type, AnalysisType::Followup);
        assert_eq!(request.api_key, None);
    }

    #[test]
    fn missing_type_is_rejected() {
        let payload = CodeAnalysis {
            analysis_type: None,
            ..payload()
        };
        assert!(payload.into_analysis_request(None).is_err());
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let payload = CodeAnalysis {
            api_key: Some("  ".to_owned()),
            ..payload()
        };
        let request = payload.into_analysis_request(None).unwrap();
        assert_eq!(request.api_key, None);
    }

    #[test]
    fn blank_fields_fail_validation() {
        let payload = CodeAnalysis {
            code: String::new(),
            ..payload()
        };
        assert!(payload.validate().is_err());
        assert!(self::payload().validate().is_ok());
    }
}
