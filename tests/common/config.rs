//! Test configuration helpers for creating keepers in temporary directories

use repo_keeper::{Config, ProjectKeeper};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Configuration with storage and catalog inside `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.base_path = dir.join("storage");
    config.persistence.database_path = dir.join("keeper.db");
    config.pipeline.max_concurrent_jobs = 2;
    config.pipeline.shutdown_timeout = Duration::from_secs(5);
    config.pipeline.retry.max_attempts = 0;
    config.server.api.bind_address = "127.0.0.1:0".parse().expect("socket address");
    config
}

/// Create a keeper rooted in a fresh temp dir (which must be kept alive)
pub async fn create_keeper() -> (Arc<ProjectKeeper>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let keeper = ProjectKeeper::new(test_config(temp_dir.path()))
        .await
        .expect("keeper starts");
    (Arc::new(keeper), temp_dir)
}
