//! # repo-keeper
//!
//! Ingestion service for zipped project archives.
//!
//! Every upload is stored verbatim, recorded in a SQLite catalog, expanded on
//! disk and repackaged into a second archive that holds only the project's
//! `.git` directory. Processing runs in the background on a bounded worker
//! pool; its progress is persisted in the catalog and broadcast as events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_keeper::{Config, ProjectKeeper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let keeper = ProjectKeeper::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = keeper.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let archive = tokio::fs::File::open("demo.zip").await?;
//!     let project = keeper.create_project("demo.zip", archive).await?;
//!     println!("stored {} as {}", project.name, project.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Catalog abstraction over project records
pub mod catalog;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// The ingestion facade
pub mod keeper;
/// On-disk layout of a project's artifacts
pub mod layout;
/// Background unpack/repackage pipeline
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Raw byte storage and zip codec
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, ArchiveError, DatabaseError, Error, ErrorDetail, Result, StorageError, ToHttpStatus,
};
pub use keeper::{Artifact, ProjectKeeper};
pub use layout::ProjectLayout;
pub use storage::LocalStorage;
pub use types::{Event, ProjectId, ProjectInfo, ProjectStatus};

use std::sync::Arc;

/// Serve the REST API until a termination signal, then shut down gracefully.
///
/// Once the signal arrives the server stops accepting connections and
/// finishes in-flight requests, then [`ProjectKeeper::shutdown`] stops the
/// pipeline and marks a clean shutdown.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use repo_keeper::{Config, ProjectKeeper, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let keeper = ProjectKeeper::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(Arc::new(keeper)).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(keeper: Arc<ProjectKeeper>) -> Result<()> {
    let config = Arc::new(keeper.config().clone());
    let served = api::serve_with_shutdown(keeper.clone(), config, wait_for_signal()).await;
    let shut_down = keeper.shutdown().await;
    served.and(shut_down)
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
