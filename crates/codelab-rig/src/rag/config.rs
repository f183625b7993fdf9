//! Document RAG configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    pub const CHUNK_SIZE: usize = 1000;
    pub const CHUNK_OVERLAP: usize = 200;
    pub const MAX_JAVA_BYTES: usize = 100 * 1024;
    pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;
    pub const CHAT_TOP_K: usize = 10;
    pub const CHAT_MIN_SCORE: f32 = 0.0;
    pub const INTENT_TOP_K: usize = 5;
    pub const INTENT_MIN_SCORE: f32 = 0.3;
}

/// Configuration for document processing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
pub struct RagConfig {
    /// Vector collection holding document segments and intents. Empty
    /// selects the store's default namespace.
    #[cfg_attr(
        feature = "config",
        arg(long = "rag-collection", env = "RAG_COLLECTION", default_value = "")
    )]
    pub collection: String,

    /// Size of a PDF chunk in characters.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PDF_CHUNK_SIZE", default_value_t = defaults::CHUNK_SIZE)
    )]
    pub chunk_size: usize,

    /// Characters shared by consecutive PDF chunks.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "PDF_CHUNK_OVERLAP", default_value_t = defaults::CHUNK_OVERLAP)
    )]
    pub chunk_overlap: usize,

    /// Largest accepted Java upload in bytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_JAVA_BYTES", default_value_t = defaults::MAX_JAVA_BYTES)
    )]
    pub max_java_bytes: usize,

    /// Largest accepted PDF upload in bytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_PDF_BYTES", default_value_t = defaults::MAX_PDF_BYTES)
    )]
    pub max_pdf_bytes: usize,

    /// Segments retrieved per chat question.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CHAT_TOP_K", default_value_t = defaults::CHAT_TOP_K)
    )]
    pub chat_top_k: usize,

    /// Minimum similarity of a retrieved segment.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CHAT_MIN_SCORE", default_value_t = defaults::CHAT_MIN_SCORE)
    )]
    pub chat_min_score: f32,

    /// Intent candidates considered per question.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "INTENT_TOP_K", default_value_t = defaults::INTENT_TOP_K)
    )]
    pub intent_top_k: usize,

    /// Minimum similarity for an intent to be detected.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "INTENT_MIN_SCORE", default_value_t = defaults::INTENT_MIN_SCORE)
    )]
    pub intent_min_score: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: String::new(),
            chunk_size: defaults::CHUNK_SIZE,
            chunk_overlap: defaults::CHUNK_OVERLAP,
            max_java_bytes: defaults::MAX_JAVA_BYTES,
            max_pdf_bytes: defaults::MAX_PDF_BYTES,
            chat_top_k: defaults::CHAT_TOP_K,
            chat_min_score: defaults::CHAT_MIN_SCORE,
            intent_top_k: defaults::INTENT_TOP_K,
            intent_min_score: defaults::INTENT_MIN_SCORE,
        }
    }
}

impl RagConfig {
    /// Validates sizes and score ranges.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("PDF chunk size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "PDF chunk overlap ({}) must be smaller than the chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.chat_top_k == 0 || self.intent_top_k == 0 {
            return Err(Error::config("top_k values must be greater than zero"));
        }
        for (name, score) in [
            ("chat", self.chat_min_score),
            ("intent", self.intent_min_score),
        ] {
            if !(-1.0..=1.0).contains(&score) {
                return Err(Error::config(format!(
                    "{name} min score must be between -1.0 and 1.0, got {score}"
                )));
            }
        }
        Ok(())
    }
}
