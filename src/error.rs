//! Error types for repo-keeper
//!
//! This module provides error handling for the whole crate:
//! - Domain-specific error types (storage, archive codec, catalog)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::ProjectStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for repo-keeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repo-keeper
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.base_path")
        key: Option<String>,
    },

    /// Catalog operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Raw byte storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unpacking or repackaging failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Project name rejected before any storage happened
    #[error("invalid project name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Project not found in the catalog
    #[error("project not found: {0}")]
    NotFound(String),

    /// A derived artifact was requested before the pipeline produced it
    #[error("artifact for project {id} is not available (status: {status})")]
    ArtifactNotReady {
        /// Project identifier
        id: String,
        /// Current pipeline status of the project
        status: ProjectStatus,
    },

    /// Shutdown in progress - not accepting new uploads
    #[error("shutdown in progress: not accepting new uploads")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Raw storage errors, one variant per step of [`LocalStorage::save`](crate::storage::LocalStorage::save)
/// and [`LocalStorage::get`](crate::storage::LocalStorage::get)
#[derive(Debug, Error)]
pub enum StorageError {
    /// Parent directory could not be created
    #[error("unable to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Existing file could not be inspected
    #[error("unable to get file info for {path}: {source}")]
    Stat {
        /// File being inspected
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Existing file could not be removed before overwrite
    #[error("unable to delete file {path}: {source}")]
    Delete {
        /// File being removed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// New file could not be created
    #[error("unable to create file {path}: {source}")]
    Create {
        /// File being created
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Copying the stream into the file failed
    #[error("unable to write to file {path}: {source}")]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Stream exceeded the configured maximum size
    #[error("file {path} exceeds the maximum size of {limit} bytes")]
    TooLarge {
        /// File being written
        path: PathBuf,
        /// Configured maximum in bytes
        limit: u64,
    },

    /// File does not exist
    #[error("file not found: {path}")]
    NotFound {
        /// Missing file
        path: PathBuf,
    },

    /// File exists but could not be opened
    #[error("unable to open file {path}: {source}")]
    Open {
        /// File being opened
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Archive codec errors (unpack and repackage)
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive file could not be opened
    #[error("unable to open archive {archive}: {source}")]
    Open {
        /// Archive path
        archive: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Archive is not a readable zip file
    #[error("corrupt archive {archive}: {reason}")]
    Corrupt {
        /// Archive path
        archive: PathBuf,
        /// Codec error message
        reason: String,
    },

    /// Filesystem failure while unpacking or repackaging
    #[error("I/O failure at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Writing the output archive failed in the codec
    #[error("unable to write archive {archive}: {reason}")]
    Write {
        /// Output archive path
        archive: PathBuf,
        /// Codec error message
        reason: String,
    },

    /// The metadata subtree to repackage does not exist
    #[error("subtree {subdir} not found under {root}")]
    SubtreeNotFound {
        /// Root that was searched
        root: PathBuf,
        /// Name of the subtree (e.g. ".git")
        subdir: String,
    },

    /// The blocking codec task panicked or was cancelled
    #[error("archive task failed: {0}")]
    TaskFailed(String),
}

impl ArchiveError {
    /// Shorthand for wrapping an I/O error with the path it happened at
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "project not found: 0c5e...",
///     "details": {
///       "project_id": "0c5e..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::InvalidName { .. } => 400,

            // 404 Not Found - unknown ids and artifacts that do not exist yet
            Error::NotFound(_) => 404,
            Error::ArtifactNotReady { .. } => 404,
            Error::Storage(StorageError::NotFound { .. }) => 404,

            // 413 Payload Too Large
            Error::Storage(StorageError::TooLarge { .. }) => 413,

            // 422 Unprocessable Entity - archive contents rejected
            Error::Archive(ArchiveError::Corrupt { .. }) => 422,
            Error::Archive(ArchiveError::SubtreeNotFound { .. }) => 422,

            // 500 Internal Server Error
            Error::Storage(_) => 500,
            Error::Archive(_) => 500,
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Storage(e) => match e {
                StorageError::CreateDir { .. } => "storage_create_dir_failed",
                StorageError::Stat { .. } => "storage_stat_failed",
                StorageError::Delete { .. } => "storage_delete_failed",
                StorageError::Create { .. } => "storage_create_failed",
                StorageError::Write { .. } => "storage_write_failed",
                StorageError::TooLarge { .. } => "payload_too_large",
                StorageError::NotFound { .. } => "not_found",
                StorageError::Open { .. } => "storage_open_failed",
            },
            Error::Archive(e) => match e {
                ArchiveError::Open { .. } => "archive_open_failed",
                ArchiveError::Corrupt { .. } => "corrupt_archive",
                ArchiveError::Io { .. } => "archive_io_error",
                ArchiveError::Write { .. } => "archive_write_failed",
                ArchiveError::SubtreeNotFound { .. } => "subtree_not_found",
                ArchiveError::TaskFailed(_) => "archive_task_failed",
            },
            Error::InvalidName { .. } => "validation_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ArtifactNotReady { .. } => "artifact_not_ready",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotFound(id) => Some(serde_json::json!({
                "project_id": id,
            })),
            Error::ArtifactNotReady { id, status } => Some(serde_json::json!({
                "project_id": id,
                "status": status,
            })),
            Error::InvalidName { name, reason } => Some(serde_json::json!({
                "name": name,
                "reason": reason,
            })),
            Error::Storage(StorageError::TooLarge { limit, .. }) => Some(serde_json::json!({
                "max_bytes": limit,
            })),
            // Details carry the file name only, never the storage root
            Error::Storage(StorageError::NotFound { path }) => path
                .file_name()
                .map(|name| serde_json::json!({ "file": name.to_string_lossy() })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
