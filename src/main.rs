//! Scrivener Server
//!
//! A self-hosted document OCR inference server: accepts image and PDF
//! uploads over HTTP, runs them through a pretrained document-OCR model,
//! and serves the recognized text and result artifacts.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod ocr;
mod pdf;
mod routes;
mod state;

use config::Config;
use ocr::CommandEngine;
use state::AppState;

/// Build the application router
fn app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router())
        .nest("/ocr", routes::ocr::router())
        .nest("/download", routes::download::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "scrivener_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Scrivener Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Model runner: {}", config.model.command);
    tracing::info!("Upload dir: {}", config.storage.upload_dir.display());
    tracing::info!("Output dir: {}", config.storage.output_dir.display());

    // Bootstrap storage directories
    std::fs::create_dir_all(&config.storage.upload_dir)
        .expect("Failed to create upload directory");
    std::fs::create_dir_all(&config.storage.output_dir)
        .expect("Failed to create output directory");

    // Create application state
    let engine = Arc::new(CommandEngine::new(&config.model.command, &config.model.args));
    let app_state = AppState::new(config.clone(), engine);

    // Warm the model up in the background; the service answers health checks
    // immediately and rejects OCR requests until loading completes.
    let warmup_state = app_state.clone();
    tokio::spawn(async move {
        match warmup_state.engine().load().await {
            Ok(()) => {
                warmup_state.mark_loaded();
                tracing::info!("Model loaded successfully");
            }
            Err(e) => {
                tracing::error!("Model warm-up failed: {}", e);
            }
        }
    });

    let app = app(app_state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Scrivener Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
