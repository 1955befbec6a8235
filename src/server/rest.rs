//! Dashboard REST endpoints.

use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tower_http::services::ServeDir;

use super::metrics::REQUEST_COUNT;
use crate::watcher::WatchSupervisor;
use crate::Error;

/// Shared state for dashboard handlers.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub supervisor: Arc<WatchSupervisor>,
    /// Images listed per directory, `None` for all.
    pub listing_limit: Option<usize>,
    pub log_file: Option<PathBuf>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
struct ImageList {
    image_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DirectoryCount {
    directory_count: usize,
}

#[derive(Debug, Serialize)]
struct Overview {
    images_by_directory: BTreeMap<usize, Vec<String>>,
}

/// Error body returned to dashboard clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn invalid_directory() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid directory ID")
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Image not found")
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            Self::invalid_directory()
        } else {
            tracing::warn!(error = %err, "Dashboard request failed");
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Route prefix under which a directory's output is served statically.
#[must_use]
pub fn static_route(index: usize) -> String {
    format!("/resized-images-{index}")
}

/// Create the dashboard router, including one static mount per output directory.
pub fn create_rest_router(state: DashboardState) -> Router {
    let mut router = Router::new()
        .route("/", get(overview))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/directory-count", get(directory_count))
        .route("/image-list/{dir_id}", get(image_list))
        .route("/images/{dir_id}/{image_name}", get(image))
        .route("/process-status/{dir_id}", get(process_status))
        .route("/log", get(read_log));

    for handler in state.supervisor.handlers() {
        router = router.nest_service(
            &static_route(handler.index()),
            ServeDir::new(&handler.pair().output_dir),
        );
    }

    router
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Count every routed request by route template and response status.
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    REQUEST_COUNT
        .with_label_values(&[endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}

fn parse_dir_id(raw: &str) -> ApiResult<usize> {
    raw.parse().map_err(|_| ApiError::invalid_directory())
}

fn file_name(path: &FsPath) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint.
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}

/// Every output directory with its statically served image URLs.
async fn overview(State(state): State<DashboardState>) -> Json<Overview> {
    let mut images_by_directory = BTreeMap::new();

    for handler in state.supervisor.handlers() {
        let route = static_route(handler.index());
        let urls = match handler.list_artifacts(None) {
            Ok(images) => images
                .iter()
                .map(|p| format!("{route}/{}", file_name(p)))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    index = handler.index(),
                    output = %handler.pair().output_dir.display(),
                    error = %e,
                    "Failed to list output directory"
                );
                Vec::new()
            }
        };
        images_by_directory.insert(handler.index(), urls);
    }

    Json(Overview {
        images_by_directory,
    })
}

async fn directory_count(State(state): State<DashboardState>) -> Json<DirectoryCount> {
    Json(DirectoryCount {
        directory_count: state.supervisor.directory_count(),
    })
}

/// Newest-first image URLs of one directory.
async fn image_list(
    State(state): State<DashboardState>,
    Path(dir_id): Path<String>,
) -> ApiResult<Json<ImageList>> {
    let index = parse_dir_id(&dir_id)?;
    let images = state
        .supervisor
        .list_artifacts(index, state.listing_limit)?;

    let image_urls = images
        .iter()
        .map(|p| format!("/images/{index}/{}", file_name(p)))
        .collect();

    Ok(Json(ImageList { image_urls }))
}

/// One derived image by name.
async fn image(
    State(state): State<DashboardState>,
    Path((dir_id, image_name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let index = parse_dir_id(&dir_id)?;
    let handler = state.supervisor.handler(index)?;

    if image_name.contains(['/', '\\']) || image_name == ".." || image_name.is_empty() {
        return Err(ApiError::not_found());
    }

    let path = handler.pair().output_dir.join(&image_name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found())?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}

/// Status snapshot of one directory.
async fn process_status(
    State(state): State<DashboardState>,
    Path(dir_id): Path<String>,
) -> ApiResult<Response> {
    let index = parse_dir_id(&dir_id)?;
    let supervisor = Arc::clone(&state.supervisor);

    // The snapshot lists the source directory; keep it off the async workers.
    let snapshot = tokio::task::spawn_blocking(move || supervisor.status(index))
        .await
        .map_err(|e| ApiError::from(Error::internal(format!("status task failed: {e}"))))??;

    tracing::debug!(
        index,
        processed = snapshot.processed_images,
        failed = snapshot.failed_images,
        "Status retrieved"
    );
    Ok(Json(snapshot).into_response())
}

/// The configured log file.
async fn read_log(State(state): State<DashboardState>) -> ApiResult<Response> {
    let path = state.log_file.as_ref().ok_or_else(|| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "no log file configured")
    })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        bytes,
    )
        .into_response())
}
