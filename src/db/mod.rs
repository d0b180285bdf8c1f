//! Database layer for repo-keeper
//!
//! Handles SQLite persistence for the project catalog.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`projects`]: Project records, the [`Catalog`](crate::catalog::Catalog) implementation
//! - [`state`]: Runtime state (shutdown tracking)

use crate::types::{ProjectId, ProjectInfo, ProjectStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod migrations;
mod projects;
mod state;

/// New project to be inserted into the catalog
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Identifier minted at ingestion
    pub id: ProjectId,
    /// Logical project name
    pub name: String,
    /// Absolute path of the directory the tree is expanded under
    pub unzipped_path: PathBuf,
    /// Absolute path of the raw archive
    pub zipped_path: PathBuf,
    /// Absolute path of the repackaged archive
    pub git_zipped_path: PathBuf,
    /// Size of the raw archive in bytes
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the raw archive
    pub sha256: String,
}

/// Project record from database
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    /// Project identifier
    pub id: ProjectId,
    /// Logical project name
    pub name: String,
    /// Absolute path of the directory the tree is expanded under
    pub unzipped_path: String,
    /// Absolute path of the raw archive
    pub zipped_path: String,
    /// Absolute path of the repackaged archive
    pub git_zipped_path: String,
    /// Pipeline status code (see [`ProjectStatus::from_i32`])
    pub status: i32,
    /// Last pipeline error
    pub error_message: Option<String>,
    /// Size of the raw archive in bytes
    pub size_bytes: i64,
    /// Hex-encoded SHA-256 of the raw archive
    pub sha256: String,
    /// Unix timestamp (milliseconds) of ingestion
    pub created_at: i64,
    /// Unix timestamp (milliseconds) of the last status change
    pub updated_at: i64,
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl From<Project> for ProjectInfo {
    fn from(row: Project) -> Self {
        ProjectInfo {
            id: row.id,
            name: row.name,
            unzipped_path: PathBuf::from(row.unzipped_path),
            zipped_path: PathBuf::from(row.zipped_path),
            git_zipped_path: PathBuf::from(row.git_zipped_path),
            status: ProjectStatus::from_i32(row.status),
            error: row.error_message,
            size_bytes: row.size_bytes.max(0) as u64,
            sha256: row.sha256,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        }
    }
}

/// Database handle for repo-keeper
pub struct Database {
    pool: SqlitePool,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
