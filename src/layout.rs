//! On-disk layout of a project's artifacts
//!
//! Every project owns one directory named after its id:
//!
//! ```text
//! {id}/zip/{name}.zip         raw uploaded archive
//! {id}/unzip/{name}/...       expanded tree
//! {id}/git/{name}.zip         repackaged metadata-only archive
//! ```
//!
//! Other components read these paths from the catalog, so the mapping must
//! never change for an existing id.

use crate::error::{Error, Result};
use crate::types::ProjectId;
use std::path::PathBuf;

/// Directory holding the raw archive
pub const RAW_DIR: &str = "zip";
/// Directory holding the expanded tree
pub const UNZIP_DIR: &str = "unzip";
/// Directory holding the repackaged archive
pub const GIT_DIR: &str = "git";
/// Extension of every archive the keeper writes
pub const ARCHIVE_EXT: &str = "zip";

const MAX_NAME_LEN: usize = 64;

/// Relative artifact paths for one project, all resolved against the storage base
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
    id: ProjectId,
    name: String,
}

impl ProjectLayout {
    /// Layout for an already validated name
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Layout for an uploaded filename; validates and normalizes it first
    pub fn for_upload(id: ProjectId, filename: &str) -> Result<Self> {
        Ok(Self::new(id, project_name_from_filename(filename)?))
    }

    /// Project id
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Logical project name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{id}`
    pub fn root(&self) -> PathBuf {
        PathBuf::from(self.id.to_string())
    }

    /// `{id}/zip/{name}.zip`
    pub fn raw_archive(&self) -> PathBuf {
        self.root().join(RAW_DIR).join(self.archive_file_name())
    }

    /// `{id}/unzip` - the directory the expanded tree is placed under
    pub fn unzip_dir(&self) -> PathBuf {
        self.root().join(UNZIP_DIR)
    }

    /// `{id}/unzip/{name}` - root of the expanded tree itself
    pub fn expanded_tree(&self) -> PathBuf {
        self.unzip_dir().join(&self.name)
    }

    /// `{id}/git` - the directory the repackaged archive is written to
    pub fn git_dir(&self) -> PathBuf {
        self.root().join(GIT_DIR)
    }

    /// `{id}/git/{name}.zip`
    pub fn git_archive(&self) -> PathBuf {
        self.git_dir().join(self.archive_file_name())
    }

    fn archive_file_name(&self) -> String {
        format!("{}.{}", self.name, ARCHIVE_EXT)
    }
}

/// Derive the logical project name from an uploaded filename
///
/// A trailing `.zip` (any case) is stripped. The remaining name must be
/// 1-64 characters of `[a-z0-9_-]` and start with a letter or digit, so it
/// can never traverse out of the project directory.
pub fn project_name_from_filename(filename: &str) -> Result<String> {
    let trimmed = filename.trim();
    let name = match trimmed.len().checked_sub(ARCHIVE_EXT.len() + 1) {
        Some(cut)
            if trimmed.is_char_boundary(cut)
                && trimmed[cut..].eq_ignore_ascii_case(".zip") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };

    validate_project_name(name)?;
    Ok(name.to_string())
}

/// Check a project name against the allowed character set
pub fn validate_project_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name must be at most 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(invalid(
            "only lowercase letters, digits, '-' and '_' are allowed",
        ));
    }
    if !name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return Err(invalid("name must start with a letter or digit"));
    }

    Ok(())
}
