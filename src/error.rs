//! Application error types
//!
//! Every handler returns `Result<T>`; failures are serialized as a JSON
//! body `{error, code}` with the matching HTTP status.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::ocr::OcrError;
use crate::pdf::DocumentError;

/// Unified application error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Model is still loading; the request was rejected before processing
    #[error("Model is still loading, try again later")]
    NotReady,

    /// Client-side error (bad upload, bad form field, illegal path)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested artifact does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// PDF parsing or rasterization failed
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Inference engine failed
    #[error("Inference error: {0}")]
    Inference(#[from] OcrError),

    /// Filesystem failure while persisting or reading task files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Malformed uploads are a client problem even though the
            // failure surfaces deep in the rasterizer.
            Self::Document(DocumentError::ParseError(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotReady => "MODEL_LOADING",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Document(_) => "DOCUMENT_ERROR",
            Self::Inference(_) => "INFERENCE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
