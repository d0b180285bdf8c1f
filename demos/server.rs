//! REST API server demo
//!
//! Runs repo-keeper with the REST API enabled. Configuration comes from the
//! `RK_*` environment variables (see `repo_keeper::config`).
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8002/swagger-ui
//! - Upload via POST http://localhost:8002/api/v1/projects/{filename}
//! - List projects via GET http://localhost:8002/api/v1/projects
//! - Stream events via GET http://localhost:8002/api/v1/events

use repo_keeper::{Config, ProjectKeeper, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repo_keeper=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.server.api.bind_address;

    let keeper = Arc::new(ProjectKeeper::new(config).await?);

    println!("Starting repo-keeper REST API server");
    println!("API Base: http://{address}/api/v1");
    println!("Swagger UI: http://{address}/swagger-ui");
    println!();
    println!("Example commands:");
    println!("  # Upload an archive");
    println!("  curl -X POST --data-binary @demo.zip http://{address}/api/v1/projects/demo.zip");
    println!();
    println!("  # List all projects");
    println!("  curl http://{address}/api/v1/projects");
    println!();
    println!("  # Stream events (Server-Sent Events)");
    println!("  curl -N http://{address}/api/v1/events");

    // Serves until SIGINT/SIGTERM, then shuts the keeper down
    run_with_shutdown(keeper).await?;

    Ok(())
}
