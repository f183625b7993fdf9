//! Prompt-building strategies, one per analysis type.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AnalysisRequest, AnalysisType, MessagePair};

/// Builds the prompts for one kind of analysis.
pub trait AnalysisStrategy: Send + Sync {
    /// The analysis type this strategy handles.
    fn analysis_type(&self) -> AnalysisType;

    /// Human readable description of the analysis.
    fn description(&self) -> &'static str;

    /// Builds the system and user messages for a request.
    fn build_messages(&self, request: &AnalysisRequest) -> MessagePair {
        MessagePair::for_analysis(&request.code, request.analysis_type, &request.language)
    }
}

macro_rules! strategy {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $description:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl AnalysisStrategy for $name {
            fn analysis_type(&self) -> AnalysisType {
                $kind
            }

            fn description(&self) -> &'static str {
                $description
            }
        }
    };
}

strategy!(
    /// Explains what code does.
    ExplainStrategy,
    AnalysisType::Explain,
    "Explains what the code does, how it works, and the key concepts involved"
);

strategy!(
    /// Suggests refactorings.
    RefactorStrategy,
    AnalysisType::Refactor,
    "Suggests improvements for code quality, readability, performance, and maintainability"
);

strategy!(
    /// Looks for bugs.
    DebugStrategy,
    AnalysisType::Debug,
    "Identifies potential bugs, issues, and provides debugging suggestions"
);

strategy!(
    /// Generates code from requirements.
    WriteCodeStrategy,
    AnalysisType::WriteCode,
    "Generates code based on user requirements, specifications, and programming language preferences"
);

strategy!(
    /// Continues a conversation.
    FollowUpStrategy,
    AnalysisType::Followup,
    "Handles follow-up questions in an ongoing conversation with a conversational approach"
);

strategy!(
    /// Combined explanation, refactoring and debugging review.
    ComprehensiveStrategy,
    AnalysisType::Analyze,
    "Provides comprehensive analysis including explanation, refactoring suggestions, and debugging insights"
);

/// Strategies keyed by the analysis type they handle.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<AnalysisType, Arc<dyn AnalysisStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registers a strategy, replacing any previous one for its type.
    pub fn register(mut self, strategy: impl AnalysisStrategy + 'static) -> Self {
        self.strategies
            .insert(strategy.analysis_type(), Arc::new(strategy));
        self
    }

    /// Returns the strategy for an analysis type.
    pub fn get(&self, analysis_type: AnalysisType) -> Option<&dyn AnalysisStrategy> {
        self.strategies.get(&analysis_type).map(Arc::as_ref)
    }

    /// Returns the number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::empty()
            .register(ExplainStrategy)
            .register(RefactorStrategy)
            .register(DebugStrategy)
            .register(WriteCodeStrategy)
            .register(FollowUpStrategy)
            .register(ComprehensiveStrategy)
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&'static str> = self.strategies.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("StrategyRegistry")
            .field("types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn default_registry_covers_every_type() {
        let registry = StrategyRegistry::default();
        assert_eq!(registry.len(), 6);
        for analysis_type in AnalysisType::iter() {
            let strategy = registry.get(analysis_type).unwrap();
            assert_eq!(strategy.analysis_type(), analysis_type);
        }
    }

    #[test]
    fn strategies_build_type_specific_messages() {
        let registry = StrategyRegistry::default();
        let request = AnalysisRequest::new("a queue", AnalysisType::WriteCode, "java", "s");
        let pair = registry.get(AnalysisType::WriteCode).unwrap().build_messages(&request);
        assert!(pair.user.content().contains("Requirements:\na queue"));
        assert!(pair.system.content().contains("expert code generator"));
    }

    #[test]
    fn empty_registry_has_no_strategy() {
        assert!(StrategyRegistry::empty().get(AnalysisType::Debug).is_none());
    }
}
