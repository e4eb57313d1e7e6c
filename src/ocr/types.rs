//! OCR Types
//!
//! Defines types shared by the inference engine, the result extractor, and
//! the request handlers.

use std::path::PathBuf;

use serde::Serialize;

/// Prompt used when the caller does not supply one
pub const DEFAULT_PROMPT: &str = "<image>\n<|grounding|>Convert the document to markdown.";

/// Separator inserted between per-page texts in the combined document result
pub const PAGE_SPLIT: &str = "\n\n<--- Page Split --->\n\n";

/// Kind of uploaded document, detected from content rather than filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Detect the document kind from the first bytes of the upload.
    ///
    /// Only the PDF signature is checked; everything else is handed to the
    /// model as an image.
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            Self::Pdf
        } else {
            Self::Image
        }
    }
}

/// One inference invocation
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Model prompt
    pub prompt: String,
    /// Path of the image to recognize
    pub image_path: PathBuf,
    /// Directory the engine may write artifacts into
    pub output_dir: PathBuf,
    /// Base resolution
    pub base_size: u32,
    /// Image resolution
    pub image_size: u32,
    /// Sizing strategy flag, passed through to the engine
    pub crop_mode: bool,
    /// Ask the engine to persist result files
    pub save_results: bool,
}

/// What one inference invocation produced
#[derive(Debug, Clone, Default)]
pub struct InferenceOutput {
    /// Recognized text, when the engine returns it directly
    pub text: Option<String>,
    /// Everything the engine printed to stdout
    pub console: String,
}

/// Inference engine error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Inference engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Model warm-up failed: {0}")]
    WarmupFailed(String),
}

/// One resolution preset supported by the model
#[derive(Debug, Clone, Serialize)]
pub struct ModePreset {
    pub name: &'static str,
    pub base_size: u32,
    pub image_size: u32,
    pub crop_mode: bool,
    pub tokens: TokenBudget,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recommended: bool,
}

/// Vision token budget of a preset
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum TokenBudget {
    Fixed(u32),
    Dynamic(&'static str),
}

/// Resolution presets with their vision token budgets
pub const MODE_PRESETS: &[ModePreset] = &[
    ModePreset {
        name: "Tiny",
        base_size: 512,
        image_size: 512,
        crop_mode: false,
        tokens: TokenBudget::Fixed(64),
        recommended: false,
    },
    ModePreset {
        name: "Small",
        base_size: 640,
        image_size: 640,
        crop_mode: false,
        tokens: TokenBudget::Fixed(100),
        recommended: false,
    },
    ModePreset {
        name: "Base",
        base_size: 1024,
        image_size: 1024,
        crop_mode: false,
        tokens: TokenBudget::Fixed(256),
        recommended: false,
    },
    ModePreset {
        name: "Large",
        base_size: 1280,
        image_size: 1280,
        crop_mode: false,
        tokens: TokenBudget::Fixed(400),
        recommended: false,
    },
    ModePreset {
        name: "Gundam",
        base_size: 1024,
        image_size: 640,
        crop_mode: true,
        tokens: TokenBudget::Dynamic("dynamic"),
        recommended: true,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_from_magic_bytes() {
        assert_eq!(
            DocumentKind::from_magic_bytes(b"%PDF-1.7 rest of file"),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn non_pdf_content_is_an_image() {
        assert_eq!(
            DocumentKind::from_magic_bytes(b"\x89PNG\r\n\x1a\n"),
            DocumentKind::Image
        );
        // Filename means nothing; only content counts
        assert_eq!(DocumentKind::from_magic_bytes(b""), DocumentKind::Image);
        assert_eq!(DocumentKind::from_magic_bytes(b"%PD"), DocumentKind::Image);
    }

    #[test]
    fn preset_table_shape() {
        assert_eq!(MODE_PRESETS.len(), 5);
        let gundam = MODE_PRESETS.iter().find(|p| p.name == "Gundam").unwrap();
        assert!(gundam.crop_mode);
        assert!(gundam.recommended);
        assert!(matches!(gundam.tokens, TokenBudget::Dynamic(_)));
    }
}
