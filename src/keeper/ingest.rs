//! Accepting uploads: store the raw archive, record it, queue the pipeline.

use crate::db::NewProject;
use crate::error::{Error, Result};
use crate::layout::ProjectLayout;
use crate::pipeline::PipelineJob;
use crate::types::{Event, ProjectId, ProjectInfo};
use std::sync::atomic::Ordering;
use tokio::io::AsyncRead;

use super::ProjectKeeper;
use super::worker::Submitted;

impl ProjectKeeper {
    /// Ingest an uploaded archive
    ///
    /// Mints a fresh id, validates the name derived from `filename`, streams
    /// `body` to `{id}/zip/{name}.zip` and records the project as `pending`
    /// with all three artifact paths. The pipeline is queued and runs in the
    /// background; this returns as soon as the raw archive is durable.
    ///
    /// A full queue does not fail the upload. The job waits for queue space
    /// in the background and runs once earlier jobs drain.
    pub async fn create_project<R>(&self, filename: &str, body: R) -> Result<ProjectInfo>
    where
        R: AsyncRead + Unpin,
    {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = ProjectId::new();
        let layout = ProjectLayout::for_upload(id, filename)?;

        let saved = self
            .storage
            .save(layout.raw_archive(), body)
            .await
            .inspect_err(|e| {
                tracing::warn!(project_id = %id, filename, error = %e, "Failed to store upload");
            })?;

        let record = NewProject {
            id,
            name: layout.name().to_string(),
            unzipped_path: self.storage.full_path(layout.unzip_dir()),
            zipped_path: saved.path,
            git_zipped_path: self.storage.full_path(layout.git_archive()),
            size_bytes: saved.size_bytes,
            sha256: saved.sha256,
        };
        self.db.insert_project(&record).await?;

        // Read back before queueing so the caller sees the `pending` record
        let info = self
            .db
            .get_project(id)
            .await?
            .map(ProjectInfo::from)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        tracing::info!(
            project_id = %id,
            name = layout.name(),
            size_bytes = record.size_bytes,
            "Project ingested"
        );
        self.emit(Event::Created {
            id,
            name: record.name.clone(),
            size_bytes: record.size_bytes,
        });

        self.queue_job(PipelineJob::from(&layout));

        Ok(info)
    }

    /// Hand a job to the worker pool, leaving it `pending` if the pool is stopped
    pub(crate) fn queue_job(&self, job: PipelineJob) {
        let id = job.id;
        match self.workers.submit(job) {
            Submitted::Queued => tracing::debug!(project_id = %id, "Pipeline job queued"),
            Submitted::Waiting => tracing::info!(
                project_id = %id,
                capacity = self.config.pipeline.queue_capacity,
                "Pipeline queue full, job waiting for space"
            ),
            Submitted::Closed => {
                tracing::warn!(project_id = %id, "Pipeline stopped, job deferred to next start")
            }
        }
    }
}
