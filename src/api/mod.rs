//! REST API server module
//!
//! Exposes the keeper over HTTP: upload an archive, list and inspect
//! projects, download the raw and repackaged archives, and follow the
//! pipeline through server-sent events.

use crate::{Config, ProjectKeeper, Result};
use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Prefix every API route is nested under
pub const API_PREFIX: &str = "/api/v1";

/// OpenAPI document served alongside Swagger UI
pub const SWAGGER_DOC_PATH: &str = "/api-docs/openapi.json";

/// Create the API router with all route definitions
///
/// # Routes
///
/// All routes live under `/api/v1`.
///
/// ## Projects
/// - `POST /projects/:filename` - Upload an archive (raw request body)
/// - `GET /projects` - List all projects, oldest first
/// - `GET /projects/:id` - Get a single project
/// - `GET /projects/:id/download` - Download the raw archive
/// - `GET /projects/:id/download/git` - Download the repackaged `.git` archive
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled),
///   backed by `GET /api-docs/openapi.json` outside the prefix
pub fn create_router(keeper: Arc<ProjectKeeper>, config: Arc<Config>) -> Router {
    let state = AppState::new(keeper, config.clone());

    // The upload path segment shares its position with `:id`, so both
    // methods are registered on the same route
    let api = Router::new()
        .route("/projects", get(routes::list_projects))
        .route(
            "/projects/:id",
            get(routes::get_project).post(routes::upload_project),
        )
        .route("/projects/:id/download", get(routes::download_raw))
        .route("/projects/:id/download/git", get(routes::download_git))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state);

    let router = Router::new().nest(API_PREFIX, api);

    // SwaggerUi registers its own document route, which must not collide
    // with the nested `/api/v1/openapi.json`
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(SWAGGER_DOC_PATH, ApiDoc::openapi()))
    } else {
        router
    };

    // Upload size is enforced by storage against `storage.max_file_size`
    let router = router
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list, or an empty list, allows every origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails. Use [`serve_with_shutdown`] to stop it
/// when a future resolves.
///
/// # Example
///
/// ```no_run
/// use repo_keeper::{Config, ProjectKeeper};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let keeper = Arc::new(ProjectKeeper::new((*config).clone()).await?);
///
/// // Start API server (blocks until it stops)
/// repo_keeper::api::start_api_server(keeper, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(keeper: Arc<ProjectKeeper>, config: Arc<Config>) -> Result<()> {
    serve_with_shutdown(keeper, config, std::future::pending()).await
}

/// Like [`start_api_server`], but stops accepting connections once
/// `shutdown` resolves and returns after in-flight requests finish.
pub async fn serve_with_shutdown<F>(
    keeper: Arc<ProjectKeeper>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(keeper, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    let local_address = listener.local_addr().map_err(crate::error::Error::Io)?;
    tracing::info!(address = %local_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
