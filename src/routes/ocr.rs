//! OCR Routes
//!
//! HTTP endpoints for document recognition.
//!
//! Endpoints:
//! - POST /ocr - multipart upload (image or PDF)
//! - POST /ocr/base64 - base64-encoded single image
//!
//! Per-request flow: persist upload -> detect PDF vs image from magic
//! bytes -> rasterize if PDF -> invoke inference per page -> merge/extract
//! results -> respond -> best-effort cleanup of temporary files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    routing::post,
    Form, Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::ocr::{
    extract_result, DocumentKind, InferenceRequest, DEFAULT_PROMPT, PAGE_SPLIT,
};
use crate::pdf::rasterize_pdf;
use crate::state::AppState;

/// Name of the combined text artifact persisted for multi-page documents
const COMBINED_RESULT_FILE: &str = "result.txt";

/// Create the OCR router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(ocr_upload))
        .route("/base64", post(ocr_base64))
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Recognition options common to both endpoints
#[derive(Debug, Clone)]
struct OcrOptions {
    prompt: Option<String>,
    base_size: u32,
    image_size: u32,
    crop_mode: bool,
    save_results: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            prompt: None,
            base_size: 1024,
            image_size: 640,
            crop_mode: true,
            save_results: false,
        }
    }
}

/// POST /ocr/base64 form body
#[derive(Debug, Deserialize)]
struct OcrBase64Request {
    image_base64: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default = "default_base_size")]
    base_size: u32,
    #[serde(default = "default_image_size")]
    image_size: u32,
    #[serde(default = "default_true")]
    crop_mode: bool,
}

fn default_base_size() -> u32 {
    1024
}

fn default_image_size() -> u32 {
    640
}

fn default_true() -> bool {
    true
}

/// Settings echoed back to the caller
#[derive(Debug, Serialize)]
struct Settings {
    prompt: String,
    base_size: u32,
    image_size: u32,
    crop_mode: bool,
}

/// Per-page metadata returned for multi-page documents
#[derive(Debug, Serialize)]
struct PageMeta {
    page: usize,
    text_length: usize,
}

#[derive(Debug, Serialize)]
struct OcrResponse {
    task_id: String,
    status: &'static str,
    result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Vec<PageMeta>>,
    settings: Settings,
    /// Artifact name -> download link, present when results were persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<BTreeMap<String, String>>,
}

/// One task's recognized content
struct TaskOutcome {
    result: String,
    pages: Option<Vec<PageMeta>>,
    files: BTreeMap<String, String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /ocr
///
/// Multipart fields: `file` (required), `prompt`, `base_size`, `image_size`,
/// `crop_mode`, `save_results`.
async fn ocr_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>> {
    state.require_loaded()?;

    let mut content: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = OcrOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                content = Some(bytes.to_vec());
            }
            "prompt" => options.prompt = Some(read_text_field(field).await?),
            "base_size" => options.base_size = parse_u32("base_size", field).await?,
            "image_size" => options.image_size = parse_u32("image_size", field).await?,
            "crop_mode" => options.crop_mode = parse_bool("crop_mode", field).await?,
            "save_results" => options.save_results = parse_bool("save_results", field).await?,
            _ => {}
        }
    }

    let content = content.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;
    let kind = DocumentKind::from_magic_bytes(&content);

    let extension = file_name
        .as_deref()
        .and_then(|n| std::path::Path::new(n).extension())
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| match kind {
            DocumentKind::Pdf => "pdf".to_string(),
            DocumentKind::Image => "png".to_string(),
        });

    tracing::info!(
        file_name = ?file_name,
        size = content.len(),
        kind = ?kind,
        "Received OCR upload"
    );

    run_task(&state, &content, &extension, kind, options).await
}

/// POST /ocr/base64
///
/// Single image only; results are never persisted.
async fn ocr_base64(
    State(state): State<AppState>,
    Form(request): Form<OcrBase64Request>,
) -> Result<Json<OcrResponse>> {
    state.require_loaded()?;

    let content = base64::engine::general_purpose::STANDARD
        .decode(request.image_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 image: {}", e)))?;

    tracing::info!(size = content.len(), "Received base64 OCR request");

    let options = OcrOptions {
        prompt: request.prompt,
        base_size: request.base_size,
        image_size: request.image_size,
        crop_mode: request.crop_mode,
        save_results: false,
    };

    // The payload is declared to be an image; PDF detection does not apply
    run_task(&state, &content, "jpg", DocumentKind::Image, options).await
}

// ============================================================================
// Task orchestration
// ============================================================================

/// Persist the upload, process it, clean up, and build the response.
async fn run_task(
    state: &AppState,
    content: &[u8],
    extension: &str,
    kind: DocumentKind,
    options: OcrOptions,
) -> Result<Json<OcrResponse>> {
    let task_id = Uuid::new_v4().to_string();
    let upload_path = state
        .config()
        .storage
        .upload_dir
        .join(format!("{}.{}", task_id, extension));
    let output_dir = state.config().storage.output_dir.join(&task_id);
    let prompt = options
        .prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    tokio::fs::write(&upload_path, content).await?;

    let mut page_images = Vec::new();
    let outcome = process(state, &task_id, &upload_path, &output_dir, kind, &options, &prompt, &mut page_images).await;

    // Temporary files go away unless the caller asked to keep results; on
    // failure they always go away. Removal failures are swallowed.
    let keep = options.save_results && outcome.is_ok();
    if !keep {
        let _ = tokio::fs::remove_file(&upload_path).await;
    }
    if !options.save_results {
        for page_image in &page_images {
            let _ = tokio::fs::remove_file(page_image).await;
        }
    }

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "OCR task failed");
            return Err(e);
        }
    };

    tracing::info!(task_id = %task_id, chars = outcome.result.chars().count(), "OCR task complete");

    Ok(Json(OcrResponse {
        task_id,
        status: "success",
        result: outcome.result,
        pages: outcome.pages,
        settings: Settings {
            prompt,
            base_size: options.base_size,
            image_size: options.image_size,
            crop_mode: options.crop_mode,
        },
        files: if outcome.files.is_empty() {
            None
        } else {
            Some(outcome.files)
        },
    }))
}

/// Process one persisted upload into a task outcome.
///
/// Rasterized page image paths are pushed into `page_images` as they are
/// created so the caller can clean them up on every exit path.
#[allow(clippy::too_many_arguments)]
async fn process(
    state: &AppState,
    task_id: &str,
    upload_path: &Path,
    output_dir: &Path,
    kind: DocumentKind,
    options: &OcrOptions,
    prompt: &str,
    page_images: &mut Vec<PathBuf>,
) -> Result<TaskOutcome> {
    tokio::fs::create_dir_all(output_dir).await?;

    match kind {
        DocumentKind::Image => {
            let request = InferenceRequest {
                prompt: prompt.to_string(),
                image_path: upload_path.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
                base_size: options.base_size,
                image_size: options.image_size,
                crop_mode: options.crop_mode,
                save_results: options.save_results,
            };

            let output = state.engine().infer(&request).await?;
            let extracted = extract_result(output_dir, Some(&output.console))?;

            let result = match output.text {
                Some(text) if !text.trim().is_empty() => text,
                _ => extracted.text,
            };

            let mut files = BTreeMap::new();
            if options.save_results {
                if let Some(source) = &extracted.source {
                    let role = if source.ends_with(".txt") { "text" } else { "markdown" };
                    files.insert(role.to_string(), download_link(task_id, source));
                }
                for (index, image) in extracted.images.iter().enumerate() {
                    let role = if index == 0 {
                        "image".to_string()
                    } else {
                        format!("image_{}", index + 1)
                    };
                    files.insert(role, download_link(task_id, image));
                }
            }

            Ok(TaskOutcome {
                result,
                pages: None,
                files,
            })
        }
        DocumentKind::Pdf => {
            let rendered = rasterize_pdf(upload_path, state.config().raster.dpi).await?;
            page_images.extend(rendered.iter().cloned());

            let mut page_texts = Vec::with_capacity(rendered.len());
            for (index, page_image) in rendered.iter().enumerate() {
                let page = index + 1;
                let page_output_dir = output_dir.join(format!("page_{}", page));
                tokio::fs::create_dir_all(&page_output_dir).await?;

                let request = InferenceRequest {
                    prompt: prompt.to_string(),
                    image_path: page_image.clone(),
                    output_dir: page_output_dir.clone(),
                    base_size: options.base_size,
                    image_size: options.image_size,
                    crop_mode: options.crop_mode,
                    save_results: options.save_results,
                };

                let output = state.engine().infer(&request).await?;
                let extracted = extract_result(&page_output_dir, Some(&output.console))?;
                let text = match output.text {
                    Some(text) if !text.trim().is_empty() => text,
                    _ => extracted.text,
                };

                tracing::debug!(task_id = %task_id, page = page, chars = text.chars().count(), "Page recognized");
                page_texts.push(text);
            }

            let combined = combine_page_texts(&page_texts);
            tokio::fs::write(output_dir.join(COMBINED_RESULT_FILE), &combined).await?;

            let pages = page_texts
                .iter()
                .enumerate()
                .map(|(index, text)| PageMeta {
                    page: index + 1,
                    text_length: text.chars().count(),
                })
                .collect();

            let mut files = BTreeMap::new();
            files.insert(
                "text".to_string(),
                download_link(task_id, COMBINED_RESULT_FILE),
            );

            Ok(TaskOutcome {
                result: combined,
                pages: Some(pages),
                files,
            })
        }
    }
}

/// Join per-page texts into the combined document result
fn combine_page_texts(pages: &[String]) -> String {
    pages.join(PAGE_SPLIT)
}

fn download_link(task_id: &str, filename: &str) -> String {
    format!("/download/{}/{}", task_id, filename)
}

// ============================================================================
// Multipart field helpers
// ============================================================================

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e)))
}

async fn parse_u32(name: &'static str, field: axum::extract::multipart::Field<'_>) -> Result<u32> {
    let value = read_text_field(field).await?;
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid value for {}: {}", name, value)))
}

async fn parse_bool(name: &'static str, field: axum::extract::multipart::Field<'_>) -> Result<bool> {
    let value = read_text_field(field).await?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::BadRequest(format!(
            "Invalid value for {}: {}",
            name, value
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use base64::Engine as _;

    use super::*;
    use crate::config::Config;
    use crate::ocr::MockEngine;

    struct TestContext {
        server: TestServer,
        upload_dir: std::path::PathBuf,
        output_dir: std::path::PathBuf,
        _tmp: tempfile::TempDir,
    }

    fn test_context(engine: MockEngine, loaded: bool) -> TestContext {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");
        let output_dir = tmp.path().join("outputs");
        std::fs::create_dir_all(&upload_dir).unwrap();
        std::fs::create_dir_all(&output_dir).unwrap();

        let mut config = Config::default();
        config.storage.upload_dir = upload_dir.clone();
        config.storage.output_dir = output_dir.clone();

        let state = AppState::new(config, Arc::new(engine));
        if loaded {
            state.mark_loaded();
        }

        let app = Router::new()
            .nest("/ocr", router())
            .nest("/download", crate::routes::download::router())
            .with_state(state);

        TestContext {
            server: TestServer::new(app).unwrap(),
            upload_dir,
            output_dir,
            _tmp: tmp,
        }
    }

    fn png_upload() -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(b"\x89PNG\r\n\x1a\nfake image".to_vec()).file_name("scan.png"),
        )
    }

    fn uploads_left(ctx: &TestContext) -> usize {
        std::fs::read_dir(&ctx.upload_dir).unwrap().count()
    }

    #[tokio::test]
    async fn rejects_requests_while_loading() {
        let ctx = test_context(MockEngine::default(), false);

        let response = ctx.server.post("/ocr").multipart(png_upload()).await;
        response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

        let response = ctx
            .server
            .post("/ocr/base64")
            .form(&[("image_base64", "aGVsbG8=")])
            .await;
        response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn recognizes_image_and_cleans_up() {
        let engine = MockEngine {
            text: Some("direct text".to_string()),
            ..MockEngine::default()
        };
        let ctx = test_context(engine, true);

        let response = ctx.server.post("/ocr").multipart(png_upload()).await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"], "direct text");
        assert!(!body["task_id"].as_str().unwrap().is_empty());
        assert_eq!(body["settings"]["base_size"], 1024);
        assert_eq!(body["settings"]["image_size"], 640);
        assert_eq!(body["settings"]["crop_mode"], true);
        assert!(body.get("files").is_none());
        assert!(body.get("pages").is_none());

        // save_results defaulted to false: the upload is gone
        assert_eq!(uploads_left(&ctx), 0);
    }

    #[tokio::test]
    async fn task_ids_are_unique() {
        let ctx = test_context(MockEngine::default(), true);

        let first: serde_json::Value =
            ctx.server.post("/ocr").multipart(png_upload()).await.json();
        let second: serde_json::Value =
            ctx.server.post("/ocr").multipart(png_upload()).await.json();

        assert_ne!(first["task_id"], second["task_id"]);
    }

    #[tokio::test]
    async fn saved_artifacts_are_downloadable() {
        let engine = MockEngine {
            text: None,
            artifact: Some(("result.mmd".to_string(), "# Recognized".to_string())),
            ..MockEngine::default()
        };
        let ctx = test_context(engine, true);

        let form = png_upload().add_text("save_results", "true");
        let response = ctx.server.post("/ocr").multipart(form).await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let task_id = body["task_id"].as_str().unwrap();
        assert_eq!(body["result"], "# Recognized");

        let link = body["files"]["markdown"].as_str().unwrap();
        assert_eq!(link, format!("/download/{}/result.mmd", task_id));

        let download = ctx.server.get(link).await;
        download.assert_status_ok();
        assert_eq!(download.text(), "# Recognized");

        // save_results keeps the upload
        assert_eq!(uploads_left(&ctx), 1);
        // The artifact lives in the task's own directory
        assert!(ctx.output_dir.join(task_id).join("result.mmd").exists());
    }

    #[tokio::test]
    async fn console_fallback_feeds_result() {
        let engine = MockEngine {
            text: None,
            console: "=====\nscraped line\ncompression ratio: 8.0\n".to_string(),
            ..MockEngine::default()
        };
        let ctx = test_context(engine, true);

        let body: serde_json::Value =
            ctx.server.post("/ocr").multipart(png_upload()).await.json();
        assert_eq!(body["result"], "scraped line");
    }

    #[tokio::test]
    async fn failure_cleans_up_upload() {
        let engine = MockEngine {
            fail_with: Some("model exploded".to_string()),
            ..MockEngine::default()
        };
        let ctx = test_context(engine, true);

        let form = png_upload().add_text("save_results", "true");
        let response = ctx.server.post("/ocr").multipart(form).await;
        response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INFERENCE_ERROR");

        // Even with save_results requested, a failed task leaves no upload
        assert_eq!(uploads_left(&ctx), 0);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let ctx = test_context(MockEngine::default(), true);

        let form = MultipartForm::new().add_text("prompt", "hello");
        let response = ctx.server.post("/ocr").multipart(form).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_form_values_are_rejected() {
        let ctx = test_context(MockEngine::default(), true);

        let form = png_upload().add_text("base_size", "enormous");
        let response = ctx.server.post("/ocr").multipart(form).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let form = png_upload().add_text("crop_mode", "maybe");
        let response = ctx.server.post("/ocr").multipart(form).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn base64_roundtrip() {
        let ctx = test_context(MockEngine::default(), true);

        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nimg");
        let response = ctx
            .server
            .post("/ocr/base64")
            .form(&[("image_base64", encoded.as_str())])
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["result"], "recognized text");
        assert!(body.get("files").is_none());
        assert_eq!(uploads_left(&ctx), 0);
    }

    #[tokio::test]
    async fn base64_rejects_undecodable_input() {
        let ctx = test_context(MockEngine::default(), true);

        let response = ctx
            .server
            .post("/ocr/base64")
            .form(&[("image_base64", "not-base64!!!")])
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn page_texts_join_with_split_marker() {
        let pages = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        assert_eq!(
            combine_page_texts(&pages),
            "one\n\n<--- Page Split --->\n\ntwo\n\n<--- Page Split --->\n\nthree"
        );
        assert_eq!(combine_page_texts(&[]), "");
    }
}
