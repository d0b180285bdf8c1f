//! Retry logic with exponential backoff
//!
//! Pipeline steps touch the filesystem only, so the transient failures worth
//! retrying are I/O errors whose kind signals a passing condition (interrupted
//! syscalls, timeouts on network mounts, a busy resource). Content problems
//! such as corrupt archives or a missing `.git` subtree never are.
//!
//! # Example
//!
//! ```no_run
//! use repo_keeper::retry::{IsRetryable, with_retry};
//! use repo_keeper::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{ArchiveError, Error, StorageError};
use rand::Rng;
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

fn is_transient_io(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::TimedOut
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ResourceBusy
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Io(e) => is_transient_io(e),
            Error::Storage(e) => match e {
                StorageError::CreateDir { source, .. }
                | StorageError::Stat { source, .. }
                | StorageError::Delete { source, .. }
                | StorageError::Create { source, .. }
                | StorageError::Write { source, .. }
                | StorageError::Open { source, .. } => is_transient_io(source),
                // Size limit and missing files are properties of the input
                StorageError::TooLarge { .. } | StorageError::NotFound { .. } => false,
            },
            Error::Archive(e) => match e {
                ArchiveError::Open { source, .. } | ArchiveError::Io { source, .. } => {
                    is_transient_io(source)
                }
                ArchiveError::Corrupt { .. }
                | ArchiveError::Write { .. }
                | ArchiveError::SubtreeNotFound { .. }
                | ArchiveError::TaskFailed(_) => false,
            },
            Error::Config { .. }
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::InvalidName { .. }
            | Error::NotFound(_)
            | Error::ArtifactNotReady { .. }
            | Error::ShuttingDown
            | Error::ApiServerError(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation is attempted once, then retried up to `config.max_attempts`
/// more times while it keeps failing with a retryable error. The last error
/// is returned once attempts are exhausted.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(wait).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Scale a delay by a random factor in `[1.0, 2.0]`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
