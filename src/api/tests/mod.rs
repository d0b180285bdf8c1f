use super::*;
use crate::keeper::test_helpers;
use crate::types::{ProjectInfo, ProjectStatus};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;


/// Helper to create a test keeper wrapped in Arc, with its router
async fn create_test_app() -> (Router, Arc<ProjectKeeper>, tempfile::TempDir) {
    let (keeper, temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);
    let config = Arc::new(keeper.config().clone());
    (create_router(keeper.clone(), config), keeper, temp_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload(filename: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/projects/{filename}"))
        .header("Content-Type", "application/zip")
        .body(Body::from(bytes))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Upload through the router and return the created record
async fn upload_ok(app: &Router, filename: &str, bytes: Vec<u8>) -> ProjectInfo {
    let response = app.clone().oneshot(upload(filename, bytes)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_api_server_spawns_and_stops() {
    let (keeper, _temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);

    let mut config = keeper.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve_with_shutdown(keeper, config, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _keeper, _temp_dir) = create_test_app().await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (keeper, _temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);
    let mut config = keeper.config().clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(keeper, Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://allowed.example")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (keeper, _temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);
    let mut config = keeper.config().clone();
    config.server.api.cors_enabled = false;
    let app = create_router(keeper, Arc::new(config));

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (keeper, _temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);

    let enabled = create_router(keeper.clone(), Arc::new(keeper.config().clone()));
    let response = enabled.oneshot(get("/swagger-ui/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = keeper.config().clone();
    config.server.api.swagger_ui = false;
    let disabled = create_router(keeper, Arc::new(config));
    let response = disabled.oneshot(get("/swagger-ui/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_router_builds_with_default_config() {
    let (keeper, _temp_dir) = test_helpers::create_test_keeper().await;
    let keeper = Arc::new(keeper);
    let config = Config::default();
    assert!(config.server.api.swagger_ui);

    let app = create_router(keeper, Arc::new(config));

    let response = app.clone().oneshot(get("/api/v1/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.clone().oneshot(get(SWAGGER_DOC_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_routes_require_api_prefix() {
    let (app, _keeper, _temp_dir) = create_test_app().await;
    let response = app.oneshot(get("/projects")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
