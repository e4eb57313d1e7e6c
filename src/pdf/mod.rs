//! PDF handling
//!
//! Low-level PDF rasterization via MuPDF. Documents are opened fresh for
//! each request inside `spawn_blocking`; no document handle outlives the
//! operation that opened it.

mod rasterizer;

pub use rasterizer::{rasterize_pdf, rasterize_pdf_blocking};

use thiserror::Error;

/// PDF document error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input could not be parsed as a PDF
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A page failed to render
    #[error("Render error: {0}")]
    RenderError(String),

    /// Page image encoding failed
    #[error("Image error: {0}")]
    ImageError(String),

    /// IO error while writing page images
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Blocking task failed to complete
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl From<mupdf::Error> for DocumentError {
    fn from(err: mupdf::Error) -> Self {
        DocumentError::RenderError(err.to_string())
    }
}

/// Result type alias for PDF operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
