//! Service identity and readiness routes
//!
//! Endpoints:
//! - GET / - service identity
//! - GET /health - readiness probe
//! - GET /models/info - supported resolution presets

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::{ModePreset, MODE_PRESETS};
use crate::state::AppState;

/// Create the health router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/models/info", get(model_info))
}

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    version: &'static str,
    status: &'static str,
}

/// GET /
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        service: "Scrivener OCR API",
        version: env!("CARGO_PKG_VERSION"),
        status: if state.model_loaded() {
            "running"
        } else {
            "initializing"
        },
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = state.model_loaded();
    Json(HealthResponse {
        status: if loaded { "healthy" } else { "loading" },
        model_loaded: loaded,
    })
}

#[derive(Serialize)]
struct ModelInfoResponse {
    model_loaded: bool,
    supported_modes: &'static [ModePreset],
}

/// GET /models/info
async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        model_loaded: state.model_loaded(),
        supported_modes: MODE_PRESETS,
    })
}
