//! OCR Module
//!
//! Inference engine plumbing for the document-OCR model and extraction of
//! its results.
//!
//! The model is an external collaborator behind the [`InferenceEngine`]
//! trait; the production implementation shells out to a configured runner
//! executable. Result text is read back from files the runner writes, with
//! a console-scraping fallback for runners that only print.

mod engine;
mod extract;
mod types;

pub use engine::{CommandEngine, InferenceEngine};
pub use extract::{extract_result, scrape_console_text, ExtractedResult};
pub use types::{
    DocumentKind, InferenceOutput, InferenceRequest, ModePreset, OcrError, TokenBudget,
    DEFAULT_PROMPT, MODE_PRESETS, PAGE_SPLIT,
};

#[cfg(test)]
pub use engine::MockEngine;
