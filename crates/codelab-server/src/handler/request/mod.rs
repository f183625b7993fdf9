//! Request types for HTTP handlers.

mod code;
mod paths;

pub use code::*;
pub use paths::*;
