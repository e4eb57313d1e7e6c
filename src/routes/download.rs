//! Artifact download routes
//!
//! Serves result files from a task's output directory.
//!
//! Endpoints:
//! - GET /download/:task_id/:filename - raw artifact bytes

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the download router
pub fn router() -> Router<AppState> {
    Router::new().route("/:task_id/:filename", get(download_artifact))
}

/// A path segment is safe when it cannot escape the task directory
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains("..")
        && !segment.contains('/')
        && !segment.contains('\\')
}

/// GET /download/:task_id/:filename
///
/// Serve one artifact file. Both segments are rejected outright if they
/// carry any path-traversal sequence; route parameters arrive
/// percent-decoded, so `%2F` and friends end up here as the raw characters.
async fn download_artifact(
    State(state): State<AppState>,
    Path((task_id, filename)): Path<(String, String)>,
) -> Result<Response> {
    if !is_safe_segment(&task_id) || !is_safe_segment(&filename) {
        return Err(AppError::BadRequest("Invalid file path".to_string()));
    }

    let path = state
        .config()
        .storage
        .output_dir
        .join(&task_id)
        .join(&filename);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("{}/{}", task_id, filename)));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::debug!(task_id = %task_id, filename = %filename, size = bytes.len(), "Serving artifact");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, guess_content_type(&filename))
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Guess content type from file extension
fn guess_content_type(path: &str) -> String {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "txt" => "text/plain; charset=utf-8",
        "md" | "mmd" => "text/markdown; charset=utf-8",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
    .to_string()
}
