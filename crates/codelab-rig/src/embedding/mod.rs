//! Text embedding providers.

mod provider;

pub use provider::EmbeddingProvider;
