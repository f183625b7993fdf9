//! Pinecone backend speaking the REST data plane API.
//!
//! Collections map to namespaces of a single index, so creating one is
//! free and deleting one removes every vector of the namespace.

mod backend;
mod config;

pub use backend::PineconeBackend;
pub use config::PineconeConfig;
