//! System and user prompts for code analysis.

use super::AnalysisType;
use crate::session::Message;

const PREAMBLE: &str = "You are an expert software developer and code analyst with deep \
knowledge of multiple programming languages. Your role is to provide professional, accurate, \
and educational code analysis. Always be helpful, clear, and thorough in your explanations. \
Use proper technical terminology while remaining accessible to developers of all levels.";

/// A system prompt paired with the user prompt it frames.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePair {
    /// Instructions for the model.
    pub system: Message,
    /// The request itself.
    pub user: Message,
}

impl MessagePair {
    /// Builds the standard pair for an analysis type.
    pub fn for_analysis(code: &str, analysis_type: AnalysisType, language: &str) -> Self {
        Self {
            system: Message::system(system_prompt(analysis_type, language)),
            user: Message::user(user_prompt(code, analysis_type, language)),
        }
    }

    /// Returns the messages in the order they are sent.
    pub fn into_messages(self) -> Vec<Message> {
        vec![self.system, self.user]
    }
}

/// Builds the system prompt: preamble, role, language context and the
/// expected response structure.
pub fn system_prompt(analysis_type: AnalysisType, language: &str) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");
    prompt.push_str(role(analysis_type));
    prompt.push_str("\n\n");
    if let Some(context) = language_context(language) {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    prompt.push_str(response_structure(analysis_type));
    prompt
}

/// Builds the user prompt around the submitted code or requirements.
pub fn user_prompt(code: &str, analysis_type: AnalysisType, language: &str) -> String {
    let intro = match analysis_type {
        AnalysisType::WriteCode => {
            "Please generate code based on the following requirements and specifications"
        }
        AnalysisType::Debug => {
            "Please analyze the following code for potential bugs, issues, or areas of concern"
        }
        AnalysisType::Refactor => {
            "Please analyze the following code for refactoring opportunities to improve code \
             quality and maintainability"
        }
        AnalysisType::Analyze => {
            "Please analyze the following code comprehensively including functionality, \
             performance, security, and maintainability"
        }
        AnalysisType::Explain | AnalysisType::Followup => {
            "Please analyze the following code professionally"
        }
    };

    match analysis_type {
        AnalysisType::WriteCode => format!(
            "{intro}:\n\nRequirements:\n{code}\n\nPlease generate the code in {language}."
        ),
        _ => format!("{intro}:\n\n```{language}\n{code}\n```"),
    }
}

fn role(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::WriteCode => {
            "You are an expert code generator specializing in creating high-quality, functional \
             code based on user requirements. Your goal is to write clean, efficient, and \
             well-documented code that meets the specified requirements. Focus on best practices, \
             proper error handling, and maintainable code structure."
        }
        AnalysisType::Debug => {
            "You are an expert debugging specialist with deep knowledge of common programming \
             errors and issues. Your role is to identify potential problems, suggest fixes, and \
             explain why issues occur. Be thorough in your analysis and provide actionable \
             solutions."
        }
        AnalysisType::Refactor => {
            "You are an expert code refactoring specialist focused on improving code quality, \
             readability, and maintainability. Your goal is to suggest improvements while \
             preserving functionality. Focus on clean code principles, performance, and best \
             practices."
        }
        AnalysisType::Analyze => {
            "You are an expert code analyst providing comprehensive code reviews. Your role is to \
             analyze code from multiple perspectives including functionality, performance, \
             security, and maintainability. Provide detailed insights and actionable \
             recommendations."
        }
        AnalysisType::Followup => {
            "You are a helpful AI programming assistant in an ongoing conversation. This is a \
             follow-up question that builds on our previous discussion. Please provide a \
             conversational and helpful response that continues the conversation naturally. If \
             the question is about code, provide code examples. If it's about explaining \
             concepts, provide clear explanations. If it's about improving or modifying code, \
             provide the improved code with explanations."
        }
        AnalysisType::Explain => {
            "You are an expert software developer and code analyst specializing in code \
             explanation. Your role is to provide clear, detailed explanations of code \
             functionality and logic. Focus on making complex concepts understandable for \
             developers of all levels."
        }
    }
}

fn language_context(language: &str) -> Option<&'static str> {
    match language.trim().to_ascii_lowercase().as_str() {
        "java" => Some("This is Java code. Consider Java-specific patterns, conventions, and best practices."),
        "python" => Some(
            "This is Python code. Consider Python-specific patterns, PEP guidelines, and best practices.",
        ),
        "javascript" | "js" => Some(
            "This is JavaScript code. Consider JavaScript-specific patterns, ES6+ features, and best practices.",
        ),
        "cpp" | "c++" => Some(
            "This is C++ code. Consider C++-specific patterns, memory management, and best practices.",
        ),
        _ => None,
    }
}

fn response_structure(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::WriteCode => {
            "Structure your response with:\n\
             - Requirements Analysis: Summary of what the user requested\n\
             - Generated Code: Complete, functional code that meets the requirements\n\
             - Code Explanation: Brief explanation of how the code works\n\
             - Usage Instructions: How to use or implement the generated code\n\
             - Additional Notes: Any important considerations or alternatives"
        }
        AnalysisType::Debug => {
            "Structure your response with:\n\
             - Issues Found: List of potential problems identified\n\
             - Root Causes: Explanation of why these issues occur\n\
             - Solutions: Specific fixes and improvements\n\
             - Prevention: How to avoid similar issues in the future"
        }
        AnalysisType::Refactor => {
            "Structure your response with:\n\
             - Current Issues: Problems with the current code\n\
             - Suggested Improvements: Specific refactoring recommendations\n\
             - Benefits: Why these changes improve the code\n\
             - Implementation: How to apply the suggested changes"
        }
        AnalysisType::Analyze => {
            "Structure your response with:\n\
             - Code Overview: Summary of functionality and purpose\n\
             - Strengths: What the code does well\n\
             - Areas for Improvement: Specific suggestions for enhancement\n\
             - Security Considerations: Potential security implications\n\
             - Performance Analysis: Efficiency considerations\n\
             - Best Practices: Recommendations for better code quality"
        }
        AnalysisType::Explain => {
            "Structure your response with:\n\
             - Overview: Brief summary of what the code does\n\
             - Functionality: Detailed explanation of how it works\n\
             - Key Concepts: Important programming concepts used\n\
             - Code Flow: Step-by-step breakdown of the logic"
        }
        AnalysisType::Followup => "Provide a comprehensive analysis of the code.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageRole;

    #[test]
    fn system_prompt_includes_language_context() {
        let prompt = system_prompt(AnalysisType::Debug, "Java");
        assert!(prompt.starts_with("You are an expert software developer"));
        assert!(prompt.contains("expert debugging specialist"));
        assert!(prompt.contains("This is Java code."));
        assert!(prompt.ends_with("- Prevention: How to avoid similar issues in the future"));
    }

    #[test]
    fn unknown_language_has_no_context() {
        let prompt = system_prompt(AnalysisType::Analyze, "cobol");
        assert!(!prompt.contains("This is"));
        assert!(prompt.contains("\n\nStructure your response with:\n- Code Overview"));
    }

    #[test]
    fn write_code_wraps_requirements() {
        let prompt = user_prompt("a stack", AnalysisType::WriteCode, "rust");
        assert_eq!(
            prompt,
            "Please generate code based on the following requirements and specifications:\n\n\
             Requirements:\na stack\n\nPlease generate the code in rust."
        );
    }

    #[test]
    fn other_types_fence_the_code() {
        let prompt = user_prompt("x = 1", AnalysisType::Explain, "python");
        assert_eq!(
            prompt,
            "Please analyze the following code professionally:\n\n```python\nx = 1\n```"
        );
    }

    #[test]
    fn pair_orders_system_first() {
        let messages = MessagePair::for_analysis("x", AnalysisType::Refactor, "js").into_messages();
        assert_eq!(messages[0].role(), MessageRole::System);
        assert_eq!(messages[1].role(), MessageRole::User);
        assert!(messages[0].content().contains("ES6+ features"));
    }
}
