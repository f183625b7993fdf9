#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod memory;
pub mod pinecone;

mod config;
mod error;
mod filter;
mod store;

pub use config::{PineconeConfig, VectorStoreConfig};
pub use error::{VectorError, VectorResult};
pub use filter::MetadataFilter;
pub use store::{SearchOptions, SearchResult, VectorData, VectorStore, VectorStoreBackend};

/// Tracing target for vector store operations.
pub const TRACING_TARGET: &str = "codelab_vector";
