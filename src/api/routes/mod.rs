//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`projects`]: upload, inspection and artifact downloads
//! - [`system`]: health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod projects;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use projects::*;
pub use system::*;

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether uploads are accepted (false once shutdown started)
    pub accepting_uploads: bool,
}
