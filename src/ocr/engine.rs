//! Inference engines
//!
//! Defines the engine trait and the subprocess-backed production
//! implementation. The model itself is an external collaborator: the engine
//! hands it an image path and an output directory, and the collaborator
//! either prints the recognized text to stdout or writes result files into
//! the output directory (or both).

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{InferenceOutput, InferenceRequest, OcrError};

/// Inference engine trait
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// One-time model warm-up. The service rejects OCR requests until this
    /// completes.
    async fn load(&self) -> Result<(), OcrError>;

    /// Run inference on a single image.
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceOutput, OcrError>;
}

/// Engine that shells out to an external model runner per call
///
/// Contract with the runner executable:
///
/// ```text
/// <command> [args..] --prompt <p> --image <path> --output-dir <dir>
///           --base-size <n> --image-size <n> [--crop-mode] [--save-results]
/// ```
///
/// plus `<command> [args..] --warmup` for the initial weight load. Recognized
/// text arrives as result files under the output directory and/or on the
/// runner's stdout, which is captured verbatim.
pub struct CommandEngine {
    command: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
        }
    }
}

#[async_trait]
impl InferenceEngine for CommandEngine {
    async fn load(&self) -> Result<(), OcrError> {
        tracing::info!(command = %self.command, "Warming up inference runner");

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--warmup")
            .output()
            .await
            .map_err(|e| {
                OcrError::EngineNotAvailable(format!("Failed to run {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::WarmupFailed(stderr.trim().to_string()));
        }

        Ok(())
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceOutput, OcrError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg("--prompt")
            .arg(&request.prompt)
            .arg("--image")
            .arg(&request.image_path)
            .arg("--output-dir")
            .arg(&request.output_dir)
            .arg("--base-size")
            .arg(request.base_size.to_string())
            .arg("--image-size")
            .arg(request.image_size.to_string());

        if request.crop_mode {
            command.arg("--crop-mode");
        }
        if request.save_results {
            command.arg("--save-results");
        }

        let output = command.output().await.map_err(|e| {
            OcrError::EngineNotAvailable(format!("Failed to run {}: {}", self.command, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::InferenceFailed(stderr.trim().to_string()));
        }

        Ok(InferenceOutput {
            text: None,
            console: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Mock engine for testing
#[cfg(test)]
pub struct MockEngine {
    /// Text returned directly from `infer`
    pub text: Option<String>,
    /// Simulated console output
    pub console: String,
    /// File written into the output directory on each call, as (name, content)
    pub artifact: Option<(String, String)>,
    /// Error returned from every `infer` call
    pub fail_with: Option<String>,
}

#[cfg(test)]
impl Default for MockEngine {
    fn default() -> Self {
        Self {
            text: Some("recognized text".to_string()),
            console: String::new(),
            artifact: None,
            fail_with: None,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl InferenceEngine for MockEngine {
    async fn load(&self) -> Result<(), OcrError> {
        Ok(())
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceOutput, OcrError> {
        if let Some(message) = &self.fail_with {
            return Err(OcrError::InferenceFailed(message.clone()));
        }

        if let Some((name, content)) = &self.artifact {
            std::fs::create_dir_all(&request.output_dir)
                .map_err(|e| OcrError::InferenceFailed(e.to_string()))?;
            std::fs::write(request.output_dir.join(name), content)
                .map_err(|e| OcrError::InferenceFailed(e.to_string()))?;
        }

        Ok(InferenceOutput {
            text: self.text.clone(),
            console: self.console.clone(),
        })
    }
}
