//! AI chat providers.
//!
//! [`AiServiceManager`] turns an [`AiService`] and an optional request key
//! into a cached [`CompletionProvider`] speaking the OpenAI chat API.

mod completion;
mod config;
mod manager;
mod service;

pub use completion::{CompletionProvider, CompletionStream};
pub use config::ProviderConfig;
pub use manager::AiServiceManager;
pub use service::AiService;
