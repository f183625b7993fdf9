//! Request extractors with improved error handling and validation.
//!
//! Drop-in replacements for the axum extractors whose rejections render as
//! [`ErrorResponse`] bodies and which carry their OpenAPI documentation.
//!
//! - [`Json`] - JSON deserialization with better error messages
//! - [`ValidateJson`] - JSON extraction with automatic validation
//! - [`Path`] - Path parameter extraction with detailed error context
//! - [`Multipart`] - Multipart form parsing for document uploads
//!
//! [`ErrorResponse`]: crate::handler::ErrorResponse

pub mod reject;

pub use crate::extract::reject::{Json, Multipart, Path, ValidateJson};
