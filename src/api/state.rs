//! Application state for the API server

use crate::{Config, ProjectKeeper};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request; both fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The keeper serving every request
    pub keeper: Arc<ProjectKeeper>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(keeper: Arc<ProjectKeeper>, config: Arc<Config>) -> Self {
        Self { keeper, config }
    }
}
