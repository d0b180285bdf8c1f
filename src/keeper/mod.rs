//! The ingestion facade
//!
//! [`ProjectKeeper`] owns every component: storage, the catalog database, the
//! archive pipeline and its worker pool, and the event channel. The HTTP
//! layer and embedding applications talk only to this type.
//!
//! ## Submodules
//!
//! - [`ingest`]: accepting uploads
//! - [`queries`]: catalog reads and artifact downloads
//! - [`lifecycle`]: startup restore and graceful shutdown
//! - [`worker`]: bounded queue and concurrency-limited job runner

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::pipeline::ArchivePipeline;
use crate::storage::LocalStorage;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::broadcast;

mod ingest;
mod lifecycle;
mod queries;
mod worker;

pub use queries::Artifact;

#[cfg(test)]
pub(crate) mod test_helpers;

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main keeper instance (cloneable - all fields are Arc-wrapped or cheap handles)
#[derive(Clone)]
pub struct ProjectKeeper {
    /// Catalog database
    /// Public for integration tests to inspect records
    pub db: Arc<Database>,
    /// Artifact storage rooted at the configured base path
    pub(crate) storage: LocalStorage,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Queue and running pipeline jobs
    pub(crate) workers: worker::WorkerPool,
    /// Flag to indicate whether new uploads are accepted (false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl ProjectKeeper {
    /// Create a new keeper
    ///
    /// This initializes every component:
    /// - Validates the configuration
    /// - Creates the storage base directory
    /// - Opens/creates the SQLite catalog and runs migrations
    /// - Starts the pipeline worker pool
    /// - Re-enqueues jobs a previous process left unfinished
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = LocalStorage::new(&config.storage.base_path, config.storage.max_file_size)?;

        let db = Database::new(&config.persistence.database_path).await?;
        if db.was_unclean_shutdown().await? {
            tracing::warn!("Previous session did not shut down cleanly");
        }
        db.set_clean_start().await?;
        let db = Arc::new(db);

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let pipeline = Arc::new(ArchivePipeline::new(
            storage.clone(),
            db.clone(),
            event_tx.clone(),
            config.pipeline.metadata_dir.clone(),
            config.pipeline.retry.clone(),
        ));

        let workers = worker::WorkerPool::start(
            pipeline,
            config.pipeline.max_concurrent_jobs,
            config.pipeline.queue_capacity,
        );

        tracing::info!(
            base_path = ?storage.base(),
            database = ?config.persistence.database_path,
            max_concurrent_jobs = config.pipeline.max_concurrent_jobs,
            "Project keeper initialized"
        );

        let keeper = Self {
            db,
            storage,
            event_tx,
            config: Arc::new(config),
            workers,
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        keeper.restore_unfinished().await?;

        Ok(keeper)
    }

    /// Subscribe to pipeline events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Artifact storage
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub(crate) fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
