//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time by utoipa and served at
//! `/api/v1/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the repo-keeper REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "repo-keeper REST API",
        version = "0.1.0",
        description = "Upload project archives, track their processing and download the raw and .git-only archives",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8002/api/v1", description = "Local development server")
    ),
    paths(
        crate::api::routes::upload_project,
        crate::api::routes::list_projects,
        crate::api::routes::get_project,
        crate::api::routes::download_raw,
        crate::api::routes::download_git,

        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::ProjectId,
        crate::types::ProjectStatus,
        crate::types::ProjectInfo,
        crate::types::Event,

        crate::api::routes::HealthResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "projects", description = "Project ingestion - upload archives, inspect status, download artifacts"),
        (name = "system", description = "System endpoints - health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
