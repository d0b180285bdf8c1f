//! Configuration types for repo-keeper

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable overriding [`StorageConfig::base_path`]
pub const ENV_BASE_PATH: &str = "RK_BASE_PATH";
/// Environment variable overriding [`StorageConfig::max_file_size`]
pub const ENV_MAX_FILE_SIZE: &str = "RK_MAX_FILE_SIZE";
/// Environment variable overriding [`PersistenceConfig::database_path`]
pub const ENV_DATABASE_PATH: &str = "RK_DATABASE_PATH";
/// Environment variable overriding [`ApiConfig::bind_address`]
pub const ENV_BIND_ADDRESS: &str = "RK_BIND_ADDRESS";
/// Environment variable overriding [`PipelineConfig::max_concurrent_jobs`]
pub const ENV_MAX_CONCURRENT_JOBS: &str = "RK_MAX_CONCURRENT_JOBS";

/// Main configuration for ProjectKeeper
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Artifact storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Background pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Catalog database settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Default configuration with overrides from the process environment
    ///
    /// See [`Config::from_env_with`] for the recognized variables.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Default configuration with overrides from an arbitrary variable lookup
    ///
    /// Recognized variables: `RK_BASE_PATH`, `RK_MAX_FILE_SIZE`,
    /// `RK_DATABASE_PATH`, `RK_BIND_ADDRESS`, `RK_MAX_CONCURRENT_JOBS`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(base) = lookup(ENV_BASE_PATH) {
            config.storage.base_path = PathBuf::from(base);
        }
        if let Some(size) = lookup(ENV_MAX_FILE_SIZE) {
            config.storage.max_file_size = parse_var(ENV_MAX_FILE_SIZE, &size)?;
        }
        if let Some(db) = lookup(ENV_DATABASE_PATH) {
            config.persistence.database_path = PathBuf::from(db);
        }
        if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
            config.server.api.bind_address = parse_var(ENV_BIND_ADDRESS, &addr)?;
        }
        if let Some(jobs) = lookup(ENV_MAX_CONCURRENT_JOBS) {
            config.pipeline.max_concurrent_jobs = parse_var(ENV_MAX_CONCURRENT_JOBS, &jobs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the keeper cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_file_size == 0 {
            return Err(invalid("storage.max_file_size", "must be greater than zero"));
        }
        if self.pipeline.max_concurrent_jobs == 0 {
            return Err(invalid(
                "pipeline.max_concurrent_jobs",
                "must be greater than zero",
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(invalid("pipeline.queue_capacity", "must be greater than zero"));
        }
        if self.pipeline.metadata_dir.is_empty()
            || self.pipeline.metadata_dir.contains(['/', '\\'])
            || self.pipeline.metadata_dir == ".."
        {
            return Err(invalid(
                "pipeline.metadata_dir",
                "must be a single directory name",
            ));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value {value:?} for {key}: {e}"),
        key: Some(key.to_string()),
    })
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

/// Artifact storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Base directory every relative artifact path is resolved against (default: "./data")
    #[serde(default = "default_base_path")]
    #[schema(value_type = String)]
    pub base_path: PathBuf,

    /// Maximum size of an uploaded archive in bytes (default: 5 GB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Background pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Maximum number of pipeline jobs running at once (default: 2)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Capacity of the pending job queue (default: 256)
    ///
    /// When the queue is full the upload still succeeds; the job waits for
    /// space and stays `pending` in the catalog until it runs.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Name of the metadata subtree to repackage (default: ".git")
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// How long shutdown waits for running jobs (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_timeout: Duration,

    /// Retry policy for transient step failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
            metadata_dir: default_metadata_dir(),
            shutdown_timeout: default_shutdown_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Catalog persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./repo-keeper.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8002)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_base_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_file_size() -> u64 {
    5 * 1000 * 1000 * 1024 // 5 GB
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    256
}

fn default_metadata_dir() -> String {
    ".git".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("repo-keeper.db")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8002))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
