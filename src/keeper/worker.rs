//! Bounded job queue with a concurrency-limited dispatcher.

use crate::pipeline::{ArchivePipeline, PipelineJob, log_outcome};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Where a submitted job ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Submitted {
    /// Placed on the queue
    Queued,
    /// Queue at capacity; a tracked task waits for space
    Waiting,
    /// Dispatcher stopped
    Closed,
}

/// Handle to the running worker pool
#[derive(Clone)]
pub(crate) struct WorkerPool {
    queue_tx: mpsc::Sender<PipelineJob>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn the dispatcher
    ///
    /// The dispatcher pulls jobs off the queue and runs each one on its own
    /// task once a semaphore permit is free, so at most `max_concurrent`
    /// jobs run at a time.
    pub(crate) fn start(
        pipeline: Arc<ArchivePipeline>,
        max_concurrent: usize,
        queue_capacity: usize,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        tracker.spawn(dispatch(
            queue_rx,
            pipeline,
            semaphore,
            tracker.clone(),
            cancel.clone(),
        ));

        Self {
            queue_tx,
            tracker,
            cancel,
        }
    }

    /// Queue a job without blocking the caller
    ///
    /// When the queue is full the job is handed to a tracked task that sends
    /// it as soon as the dispatcher frees a slot. That task gives up on
    /// cancellation, leaving the project in its catalog status.
    pub(crate) fn submit(&self, job: PipelineJob) -> Submitted {
        let job = match self.queue_tx.try_send(job) {
            Ok(()) => return Submitted::Queued,
            Err(mpsc::error::TrySendError::Closed(_)) => return Submitted::Closed,
            Err(mpsc::error::TrySendError::Full(job)) => job,
        };

        let queue_tx = self.queue_tx.clone();
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            let id = job.id;
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(project_id = %id, "Shutdown before queue space freed, job left for next start");
                }
                sent = queue_tx.send(job) => match sent {
                    Ok(()) => tracing::debug!(project_id = %id, "Waiting pipeline job queued"),
                    Err(_) => tracing::debug!(project_id = %id, "Pipeline stopped, job left for next start"),
                },
            }
        });
        Submitted::Waiting
    }

    /// Signal the dispatcher and running jobs to stop between steps
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Wait for the dispatcher and every spawned job to finish
    ///
    /// Only completes after [`WorkerPool::cancel`].
    pub(crate) async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Number of tasks still tracked (dispatcher included while it runs)
    pub(crate) fn tracked(&self) -> usize {
        self.tracker.len()
    }
}

async fn dispatch(
    mut queue_rx: mpsc::Receiver<PipelineJob>,
    pipeline: Arc<ArchivePipeline>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    tracing::debug!("Pipeline dispatcher started");

    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = queue_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        tracing::debug!(project_id = %job.id, "Dispatching pipeline job");
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tracker.spawn(async move {
            let _permit = permit;
            let outcome = pipeline.run(&job, &cancel).await;
            log_outcome(job.id, &outcome);
        });
    }

    // Jobs still queued stay in their catalog status for the next start
    queue_rx.close();
    tracing::debug!("Pipeline dispatcher stopped");
}
