//! Project handlers: upload, inspection and artifact downloads.

use crate::api::AppState;
use crate::error::Result;
use crate::keeper::Artifact;
use crate::types::ProjectInfo;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

/// POST /projects/:filename - Upload an archive
///
/// The request body is the raw archive, streamed to storage as it arrives.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{filename}",
    tag = "projects",
    params(
        ("filename" = String, Path, description = "Archive file name; the project name is this without a trailing .zip")
    ),
    request_body(content = Vec<u8>, description = "Raw zip archive bytes", content_type = "application/zip"),
    responses(
        (status = 201, description = "Archive stored, processing queued", body = ProjectInfo),
        (status = 400, description = "Invalid project name", body = crate::error::ApiError),
        (status = 413, description = "Archive exceeds the configured maximum size", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError),
        (status = 500, description = "Storage failure", body = crate::error::ApiError)
    )
)]
pub async fn upload_project(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Body,
) -> Result<(StatusCode, Json<ProjectInfo>)> {
    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let reader = StreamReader::new(stream);

    let info = state.keeper.create_project(&filename, reader).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// GET /projects - List all projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "projects",
    responses(
        (status = 200, description = "All projects, oldest first", body = Vec<ProjectInfo>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectInfo>>> {
    Ok(Json(state.keeper.list_projects().await?))
}

/// GET /projects/:id - Get a single project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project information", body = ProjectInfo),
        (status = 404, description = "Unknown or malformed ID", body = crate::error::ApiError)
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectInfo>> {
    Ok(Json(state.keeper.get_project(&id).await?))
}

/// GET /projects/:id/download - Download the raw archive
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/download",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "The archive as uploaded", content_type = "application/zip"),
        (status = 404, description = "Unknown project or missing file", body = crate::error::ApiError)
    )
)]
pub async fn download_raw(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let artifact = state.keeper.open_raw_archive(&id).await?;
    Ok(stream_artifact(artifact))
}

/// GET /projects/:id/download/git - Download the repackaged `.git` archive
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/download/git",
    tag = "projects",
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Archive of the project's .git directory", content_type = "application/zip"),
        (status = 404, description = "Unknown project, or processing not finished", body = crate::error::ApiError)
    )
)]
pub async fn download_git(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let artifact = state.keeper.open_git_archive(&id).await?;
    Ok(stream_artifact(artifact))
}

fn stream_artifact(artifact: Artifact) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.file_name.replace('"', "")
    );
    let body = Body::from_stream(ReaderStream::new(artifact.file));

    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, artifact.size_bytes.to_string()),
        ],
        body,
    )
        .into_response()
}
