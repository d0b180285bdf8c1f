//! Archive pipeline: expand a stored upload and repackage its metadata subtree
//!
//! One [`PipelineJob`] per upload, run strictly in order:
//!
//! 1. `unpacking`: expand the raw archive under `{id}/unzip/{name}`
//! 2. `repackaging`: pack the `.git` subtree into `{id}/git/{name}.zip`
//! 3. `done`
//!
//! Every transition is written to the catalog before the step starts and
//! broadcast as an [`Event`]. The first failing step moves the project to
//! `failed` with the error message and ends the job; nothing produced so far
//! is rolled back.

use crate::catalog::Catalog;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::layout::ProjectLayout;
use crate::retry::with_retry;
use crate::storage::LocalStorage;
use crate::types::{Event, ProjectId, ProjectStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One unit of pipeline work, in paths relative to the storage base
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineJob {
    /// Project being processed
    pub id: ProjectId,
    /// Logical project name
    pub name: String,
    /// `{id}/zip/{name}.zip`
    pub raw_archive: PathBuf,
    /// `{id}/unzip`
    pub unzip_dir: PathBuf,
    /// `{id}/git`
    pub git_dir: PathBuf,
}

impl From<&ProjectLayout> for PipelineJob {
    fn from(layout: &ProjectLayout) -> Self {
        Self {
            id: layout.id(),
            name: layout.name().to_string(),
            raw_archive: layout.raw_archive(),
            unzip_dir: layout.unzip_dir(),
            git_dir: layout.git_dir(),
        }
    }
}

/// How a job ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// All artifacts produced
    Done {
        /// Absolute path of the repackaged archive
        git_archive: PathBuf,
    },
    /// A step failed; the project is marked `failed`
    Failed {
        /// Stage that failed
        stage: ProjectStatus,
        /// Error message recorded in the catalog
        error: String,
    },
    /// Shutdown interrupted the job between steps; the catalog keeps the
    /// last working status so the next start resumes it
    Cancelled,
}

/// Runs [`PipelineJob`]s against storage and the catalog
pub struct ArchivePipeline {
    storage: LocalStorage,
    catalog: Arc<dyn Catalog>,
    event_tx: broadcast::Sender<Event>,
    metadata_dir: String,
    retry: RetryConfig,
}

impl ArchivePipeline {
    /// Create a pipeline
    pub fn new(
        storage: LocalStorage,
        catalog: Arc<dyn Catalog>,
        event_tx: broadcast::Sender<Event>,
        metadata_dir: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            storage,
            catalog,
            event_tx,
            metadata_dir: metadata_dir.into(),
            retry,
        }
    }

    /// Run `job` to completion, failure or cancellation
    ///
    /// Step failures are recorded in the catalog and reported as
    /// [`JobOutcome::Failed`]. An `Err` means the catalog itself could not be
    /// updated.
    pub async fn run(&self, job: &PipelineJob, cancel: &CancellationToken) -> Result<JobOutcome> {
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        let archive = self.storage.full_path(&job.raw_archive);
        let unzip_dir = self.storage.full_path(&job.unzip_dir);
        let git_dir = self.storage.full_path(&job.git_dir);

        self.transition(job.id, ProjectStatus::Unpacking).await?;
        let step = with_retry(&self.retry, || {
            self.storage.unzip(&archive, &unzip_dir, &job.name)
        })
        .await;
        if let Err(e) = step {
            return self.fail(job.id, ProjectStatus::Unpacking, e).await;
        }

        if cancel.is_cancelled() {
            info!(project_id = %job.id, "pipeline cancelled after unpacking");
            return Ok(JobOutcome::Cancelled);
        }

        self.transition(job.id, ProjectStatus::Repackaging).await?;
        let step = with_retry(&self.retry, || {
            self.storage
                .zip(&unzip_dir, &git_dir, &self.metadata_dir, &job.name)
        })
        .await;
        let git_archive = match step {
            Ok(path) => path,
            Err(e) => return self.fail(job.id, ProjectStatus::Repackaging, e).await,
        };

        self.catalog
            .update_status(job.id, ProjectStatus::Done, None)
            .await?;
        info!(project_id = %job.id, archive = ?git_archive, "pipeline complete");
        self.emit(Event::Completed {
            id: job.id,
            git_zipped_path: git_archive.clone(),
        });

        Ok(JobOutcome::Done { git_archive })
    }

    async fn transition(&self, id: ProjectId, status: ProjectStatus) -> Result<()> {
        self.catalog.update_status(id, status, None).await?;
        info!(project_id = %id, %status, "pipeline stage");
        self.emit(Event::Stage { id, status });
        Ok(())
    }

    async fn fail(
        &self,
        id: ProjectId,
        stage: ProjectStatus,
        e: crate::Error,
    ) -> Result<JobOutcome> {
        let message = e.to_string();
        error!(project_id = %id, %stage, error = %e, "pipeline step failed");

        self.catalog
            .update_status(id, ProjectStatus::Failed, Some(&message))
            .await?;
        self.emit(Event::Failed {
            id,
            stage,
            error: message.clone(),
        });

        Ok(JobOutcome::Failed {
            stage,
            error: message,
        })
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        if self.event_tx.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }
}

/// Log a finished job, for callers that run jobs in the background
pub(crate) fn log_outcome(id: ProjectId, outcome: &Result<JobOutcome>) {
    match outcome {
        Ok(JobOutcome::Done { .. }) | Ok(JobOutcome::Failed { .. }) => {}
        Ok(JobOutcome::Cancelled) => {
            info!(project_id = %id, "job left for the next start");
        }
        Err(e) => {
            warn!(project_id = %id, error = %e, "could not record pipeline status");
        }
    }
}
