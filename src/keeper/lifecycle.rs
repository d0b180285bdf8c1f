//! Startup and shutdown coordination.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::layout::ProjectLayout;
use crate::pipeline::PipelineJob;
use crate::types::{Event, ProjectStatus};
use std::sync::atomic::Ordering;

use super::ProjectKeeper;

impl ProjectKeeper {
    /// Gracefully shut down the keeper
    ///
    /// 1. Stops accepting uploads
    /// 2. Stops the dispatcher and signals running jobs to stop between steps
    /// 3. Waits for running jobs, up to `pipeline.shutdown_timeout`
    /// 4. Marks a clean shutdown in the catalog
    ///
    /// Interrupted jobs keep their working status and are resumed by the
    /// next [`ProjectKeeper::new`].
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new uploads");

        self.workers.cancel();
        tracing::debug!(tasks = self.workers.tracked(), "Waiting for pipeline tasks");

        let timeout = self.config.pipeline.shutdown_timeout;
        match tokio::time::timeout(timeout, self.workers.wait()).await {
            Ok(()) => tracing::info!("All pipeline jobs stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for pipeline jobs, proceeding with shutdown"
            ),
        }

        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
        } else {
            tracing::info!("Marked clean shutdown in database");
        }

        self.emit(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether uploads are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Re-enqueue jobs a previous process left `pending`, `unpacking` or `repackaging`
    pub(crate) async fn restore_unfinished(&self) -> Result<usize> {
        let unfinished = self.db.find_by_status(&ProjectStatus::unfinished()).await?;
        let count = unfinished.len();

        for project in unfinished {
            tracing::info!(
                project_id = %project.id,
                status = %project.status,
                "Restoring unfinished pipeline job"
            );
            let layout = ProjectLayout::new(project.id, &project.name);
            self.queue_job(PipelineJob::from(&layout));
        }

        if count > 0 {
            tracing::info!(count, "Restored unfinished pipeline jobs");
        }
        Ok(count)
    }
}
