//! In-process vector store backend.

mod backend;

pub use backend::{MemoryBackend, cosine_similarity};
