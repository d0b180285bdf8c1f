//! Catalog reads and artifact downloads.

use crate::catalog::Catalog;
use crate::error::{Error, Result, StorageError};
use crate::layout::ProjectLayout;
use crate::types::{ProjectId, ProjectInfo, ProjectStatus};
use std::path::Path;

use super::ProjectKeeper;

/// An open artifact ready to stream
#[derive(Debug)]
pub struct Artifact {
    /// Open read handle, owned by the caller
    pub file: tokio::fs::File,
    /// File name to present to clients (e.g. `demo.zip`)
    pub file_name: String,
    /// Size in bytes
    pub size_bytes: u64,
}

impl ProjectKeeper {
    /// All projects, oldest first
    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        self.db.find_all().await
    }

    /// One project by its textual id
    ///
    /// A malformed id is reported the same way as an unknown one.
    pub async fn get_project(&self, id: &str) -> Result<ProjectInfo> {
        let parsed: ProjectId = id.parse().map_err(|_| Error::NotFound(id.to_string()))?;
        self.db
            .find_by_id(parsed)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Open the raw uploaded archive
    pub async fn open_raw_archive(&self, id: &str) -> Result<Artifact> {
        let project = self.get_project(id).await?;
        let layout = ProjectLayout::new(project.id, &project.name);
        self.open_artifact(&layout.raw_archive()).await
    }

    /// Open the repackaged `.git` archive
    ///
    /// Fails with [`Error::ArtifactNotReady`] until the pipeline is `done`.
    pub async fn open_git_archive(&self, id: &str) -> Result<Artifact> {
        let project = self.get_project(id).await?;
        if project.status != ProjectStatus::Done {
            return Err(Error::ArtifactNotReady {
                id: project.id.to_string(),
                status: project.status,
            });
        }
        let layout = ProjectLayout::new(project.id, &project.name);
        self.open_artifact(&layout.git_archive()).await
    }

    async fn open_artifact(&self, relative: &Path) -> Result<Artifact> {
        let file = self.storage.get(relative).await?;
        let size_bytes = file
            .metadata()
            .await
            .map_err(|source| StorageError::Open {
                path: self.storage.full_path(relative),
                source,
            })?
            .len();
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Artifact {
            file,
            file_name,
            size_bytes,
        })
    }
}
