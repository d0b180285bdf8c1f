//! Shared test helpers for creating ProjectKeeper instances in tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::catalog::Catalog;
use crate::config::Config;
use crate::keeper::ProjectKeeper;
use crate::types::{ProjectId, ProjectInfo, ProjectStatus};
use std::path::Path;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Test configuration rooted inside `dir`, with fast retries
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.base_path = dir.join("data");
    config.persistence.database_path = dir.join("catalog.db");
    config.pipeline.max_concurrent_jobs = 2;
    config.pipeline.shutdown_timeout = Duration::from_secs(5);
    config.pipeline.retry.max_attempts = 0;
    config.pipeline.retry.jitter = false;
    config
}

/// Helper to create a test ProjectKeeper instance with a persistent database.
/// Returns the keeper and the tempdir (which must be kept alive).
pub(crate) async fn create_test_keeper() -> (ProjectKeeper, TempDir) {
    let temp_dir = tempdir().unwrap();
    let keeper = ProjectKeeper::new(test_config(temp_dir.path()))
        .await
        .unwrap();
    (keeper, temp_dir)
}

/// Poll the catalog until the project reaches a terminal status
pub(crate) async fn wait_for_terminal(keeper: &ProjectKeeper, id: ProjectId) -> ProjectInfo {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let info = keeper.db.find_by_id(id).await.unwrap().unwrap();
        if info.status.is_terminal() {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "project {id} stuck in {}",
            info.status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until `status` is reached, panicking on any other terminal status
pub(crate) async fn wait_for_status(
    keeper: &ProjectKeeper,
    id: ProjectId,
    status: ProjectStatus,
) -> ProjectInfo {
    let info = wait_for_terminal(keeper, id).await;
    assert_eq!(info.status, status, "error: {:?}", info.error);
    info
}
