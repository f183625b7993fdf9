//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Security: CORS, security headers, body limits and compression
//! - Observability: request tracing and request IDs
//! - Recovery: panics and request timeouts
//! - OpenAPI documentation with the Scalar UI
//!
//! ```rust,ignore
//! use codelab_server::middleware::*;
//!
//! let app = api
//!     .with_open_api(OpenApiConfig::default())
//!     .with_state(state)
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod observability;
mod recovery;
mod security;
mod specification;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{
    CorsConfig, FrameOptions, ReferrerPolicy, RouterSecurityExt, SecurityHeadersConfig,
};
pub use specification::{OpenApiConfig, RouterOpenApiExt};

/// Largest accepted request body: 12MB, enough for a 10MB PDF upload
/// with its multipart framing.
pub const DEFAULT_MAX_BODY_SIZE: usize = 12 * 1024 * 1024;
