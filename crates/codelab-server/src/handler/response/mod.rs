//! Response types for HTTP handlers.

mod documents;
mod errors;
mod health;
mod placeholders;
mod sessions;

pub use documents::*;
pub use errors::*;
pub use health::*;
pub use placeholders::*;
pub use sessions::*;
