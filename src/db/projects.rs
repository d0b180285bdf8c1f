//! Project catalog CRUD.

use crate::catalog::Catalog;
use crate::error::DatabaseError;
use crate::types::{ProjectId, ProjectInfo, ProjectStatus};
use crate::{Error, Result};
use async_trait::async_trait;

use super::{Database, NewProject, Project};

const SELECT_PROJECTS: &str = r#"
    SELECT id, name, unzipped_path, zipped_path, git_zipped_path, status,
           error_message, size_bytes, sha256, created_at, updated_at
    FROM projects
"#;

impl Database {
    /// Insert a new project with status `pending`
    pub async fn insert_project(&self, project: &NewProject) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, name, unzipped_path, zipped_path, git_zipped_path,
                status, size_bytes, sha256, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.unzipped_path.to_string_lossy().into_owned())
        .bind(project.zipped_path.to_string_lossy().into_owned())
        .bind(project.git_zipped_path.to_string_lossy().into_owned())
        .bind(ProjectStatus::Pending.to_i32())
        .bind(i64::try_from(project.size_bytes).unwrap_or(i64::MAX))
        .bind(&project.sha256)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Database(DatabaseError::ConstraintViolation(format!(
                    "Project {} already exists",
                    project.id
                )))
            }
            e => Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert project: {}",
                e
            ))),
        })?;

        Ok(())
    }

    /// Get a project by ID
    pub async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!("{SELECT_PROJECTS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get project: {}",
                    e
                )))
            })?;

        Ok(project)
    }

    /// List every project, oldest first
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "{SELECT_PROJECTS} ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list projects: {}",
                e
            )))
        })?;

        Ok(projects)
    }

    /// List projects in any of the given statuses, oldest first
    pub async fn list_projects_by_status(&self, statuses: &[ProjectStatus]) -> Result<Vec<Project>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "{SELECT_PROJECTS} WHERE status IN ({placeholders}) ORDER BY created_at ASC, id ASC"
        );

        let mut query = sqlx::query_as::<_, Project>(&sql);
        for status in statuses {
            query = query.bind(status.to_i32());
        }

        let projects = query.fetch_all(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list projects by status: {}",
                e
            )))
        })?;

        Ok(projects)
    }

    /// Update a project's pipeline status and error message
    ///
    /// Every other column is write-once.
    pub async fn update_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET status = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.to_i32())
        .bind(error_message)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update project status: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl Catalog for Database {
    async fn insert(&self, project: &NewProject) -> Result<()> {
        self.insert_project(project).await
    }

    async fn find_all(&self) -> Result<Vec<ProjectInfo>> {
        Ok(self
            .list_projects()
            .await?
            .into_iter()
            .map(ProjectInfo::from)
            .collect())
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<ProjectInfo>> {
        Ok(self.get_project(id).await?.map(ProjectInfo::from))
    }

    async fn update_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        self.update_project_status(id, status, error_message).await
    }

    async fn find_by_status(&self, statuses: &[ProjectStatus]) -> Result<Vec<ProjectInfo>> {
        Ok(self
            .list_projects_by_status(statuses)
            .await?
            .into_iter()
            .map(ProjectInfo::from)
            .collect())
    }
}
