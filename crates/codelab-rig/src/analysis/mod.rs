//! Code analysis: prompt strategies, chat services and the session-aware
//! [`CodeAnalysisService`].

mod chat_service;
mod factory;
mod kind;
mod prompt;
mod service;
mod strategy;
mod types;

#[cfg(any(test, feature = "mock"))]
pub use chat_service::MockChatService;
pub use chat_service::{AiChatService, AnalysisStream, ProviderChatService};
pub use factory::AiServiceFactory;
pub use kind::AnalysisType;
pub use prompt::{MessagePair, system_prompt, user_prompt};
pub use service::CodeAnalysisService;
pub use strategy::{
    AnalysisStrategy, ComprehensiveStrategy, DebugStrategy, ExplainStrategy, FollowUpStrategy,
    RefactorStrategy, StrategyRegistry, WriteCodeStrategy,
};
pub use types::{AnalysisRequest, AnalysisResponse, StreamEventType, StreamingAnalysisResponse};
