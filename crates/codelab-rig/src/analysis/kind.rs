//! Kinds of code analysis.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The kind of analysis a request asks for.
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
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AnalysisType {
    /// Generate code from requirements.
    WriteCode,
    /// Explain what code does.
    Explain,
    /// Suggest refactorings.
    Refactor,
    /// Look for bugs.
    Debug,
    /// Comprehensive review.
    Analyze,
    /// Follow-up question in an ongoing conversation.
    Followup,
}

impl AnalysisType {
    /// Returns a human readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::WriteCode => "Generate code based on user requirements and specifications",
            Self::Explain => "Explain the code functionality and logic",
            Self::Refactor => "Provide refactoring suggestions and improvements",
            Self::Debug => "Analyze potential bugs and debugging tips",
            Self::Analyze => {
                "Comprehensive analysis including explanation, refactoring, and debugging"
            }
            Self::Followup => "Handle follow-up questions in an ongoing conversation",
        }
    }

    /// Returns the wire name, for example `WRITE_CODE`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(AnalysisType::WriteCode.as_str(), "WRITE_CODE");
        assert_eq!(
            serde_json::to_string(&AnalysisType::Followup).unwrap(),
            "\"FOLLOWUP\""
        );
        assert_eq!(
            "write_code".parse::<AnalysisType>().unwrap(),
            AnalysisType::WriteCode
        );
    }

    #[test]
    fn descriptions() {
        assert_eq!(
            AnalysisType::Debug.description(),
            "Analyze potential bugs and debugging tips"
        );
    }
}
