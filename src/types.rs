//! Core types for repo-keeper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for an ingested project
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Mint a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Hyphenated lowercase form; this is also the on-disk directory name
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// Stored as TEXT in SQLite so rows stay readable from the sqlite3 shell
impl sqlx::Type<sqlx::Sqlite> for ProjectId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ProjectId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode(self.to_string(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ProjectId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse()?)
    }
}

/// Pipeline status of a project
///
/// `Pending → Unpacking → Repackaging → Done`, with `Failed` reachable from
/// either working state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Raw archive stored, pipeline not started yet
    Pending,
    /// Expanding the raw archive
    Unpacking,
    /// Repackaging the metadata subtree
    Repackaging,
    /// All artifacts produced
    Done,
    /// A pipeline step failed
    Failed,
}

impl ProjectStatus {
    /// Convert integer status code to ProjectStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ProjectStatus::Pending,
            1 => ProjectStatus::Unpacking,
            2 => ProjectStatus::Repackaging,
            3 => ProjectStatus::Done,
            4 => ProjectStatus::Failed,
            _ => ProjectStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert ProjectStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ProjectStatus::Pending => 0,
            ProjectStatus::Unpacking => 1,
            ProjectStatus::Repackaging => 2,
            ProjectStatus::Done => 3,
            ProjectStatus::Failed => 4,
        }
    }

    /// Lowercase name, as used in JSON and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Unpacking => "unpacking",
            ProjectStatus::Repackaging => "repackaging",
            ProjectStatus::Done => "done",
            ProjectStatus::Failed => "failed",
        }
    }

    /// True once the pipeline will not touch the project again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Done | ProjectStatus::Failed)
    }

    /// Statuses a restarted process must pick back up
    pub fn unfinished() -> [ProjectStatus; 3] {
        [
            ProjectStatus::Pending,
            ProjectStatus::Unpacking,
            ProjectStatus::Repackaging,
        ]
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted during ingestion and pipeline processing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Raw archive stored and catalog record created
    Created {
        /// Project ID
        id: ProjectId,
        /// Project name
        name: String,
        /// Stored size of the raw archive
        size_bytes: u64,
    },

    /// Pipeline moved to a new working stage
    Stage {
        /// Project ID
        id: ProjectId,
        /// New status
        status: ProjectStatus,
    },

    /// Pipeline produced all artifacts
    Completed {
        /// Project ID
        id: ProjectId,
        /// Absolute path of the repackaged archive
        #[schema(value_type = String)]
        git_zipped_path: PathBuf,
    },

    /// Pipeline stopped at a failed step
    Failed {
        /// Project ID
        id: ProjectId,
        /// Stage during which the failure happened
        stage: ProjectStatus,
        /// Error message
        error: String,
    },

    /// Keeper is shutting down
    Shutdown,
}

/// Project information returned by the API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectInfo {
    /// Project ID
    pub id: ProjectId,
    /// Logical project name
    pub name: String,
    /// Absolute path of the expanded tree's root directory
    #[schema(value_type = String)]
    pub unzipped_path: PathBuf,
    /// Absolute path of the raw uploaded archive
    #[schema(value_type = String)]
    pub zipped_path: PathBuf,
    /// Absolute path of the repackaged metadata-only archive
    #[schema(value_type = String)]
    pub git_zipped_path: PathBuf,
    /// Pipeline status
    pub status: ProjectStatus,
    /// Last pipeline error, if the pipeline failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Size of the raw archive in bytes
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the raw archive
    pub sha256: String,
    /// When the project was ingested
    pub created_at: DateTime<Utc>,
    /// When the pipeline status last changed
    pub updated_at: DateTime<Utc>,
}
