//! Durable mapping from project id to project record
//!
//! [`Database`](crate::db::Database) is the production implementation. The
//! pipeline only ever talks to this trait.

use crate::db::NewProject;
use crate::error::Result;
use crate::types::{ProjectId, ProjectInfo, ProjectStatus};
use async_trait::async_trait;

/// Project catalog operations
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Store a new record with status `pending`
    ///
    /// Fails with a constraint violation if the id already exists.
    async fn insert(&self, project: &NewProject) -> Result<()>;

    /// All records, oldest first (ties broken by id)
    async fn find_all(&self) -> Result<Vec<ProjectInfo>>;

    /// One record, or `None` if the id is unknown
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<ProjectInfo>>;

    /// Record a pipeline transition
    ///
    /// Only the status, error message and update time change. Fails with
    /// [`Error::NotFound`](crate::Error::NotFound) for an unknown id.
    async fn update_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Records whose status is one of `statuses`, oldest first
    async fn find_by_status(&self, statuses: &[ProjectStatus]) -> Result<Vec<ProjectInfo>>;
}
