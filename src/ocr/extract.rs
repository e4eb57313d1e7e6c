//! Result extraction
//!
//! After inference, the recognized text lives either in files the engine
//! wrote under the task's output directory or in the console output it
//! printed. File contents win; console scraping is a compatibility shim for
//! runners that only print.

use std::path::Path;

/// Plain-text result extensions, probed before markdown
const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// Markdown result extensions
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mmd"];

/// Auxiliary image artifact extensions
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Diagnostic line markers the runner is known to print between result text.
/// Best-effort: if the runner changes its logging format this list will
/// over- or under-strip.
const SKIP_MARKERS: &[&str] = &[
    "=====",
    "image size:",
    "valid image tokens:",
    "output texts tokens",
    "compression ratio:",
];

/// What was found in a task's output directory
#[derive(Debug, Clone, Default)]
pub struct ExtractedResult {
    /// Recognized text
    pub text: String,
    /// Name of the file the text came from, if any
    pub source: Option<String>,
    /// Image artifact names, relative to the output directory
    pub images: Vec<String>,
}

/// Extract the recognized text and artifact names from an output directory.
///
/// Probes the first non-empty text-bearing file (plain text first, then
/// markdown) in directory-listing order. When no file yields text and a
/// captured console stream is available, falls back to scraping it.
pub fn extract_result(output_dir: &Path, console: Option<&str>) -> std::io::Result<ExtractedResult> {
    let mut result = ExtractedResult::default();

    if output_dir.is_dir() {
        let mut text_candidates = Vec::new();
        let mut markdown_candidates = Vec::new();

        for entry in std::fs::read_dir(output_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let ext = name
                .rsplit('.')
                .next()
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();

            if TEXT_EXTENSIONS.contains(&ext.as_str()) {
                text_candidates.push(entry.path());
            } else if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
                markdown_candidates.push(entry.path());
            } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                result.images.push(name);
            }
        }

        for path in text_candidates.into_iter().chain(markdown_candidates) {
            let content = std::fs::read_to_string(&path)?;
            if !content.trim().is_empty() {
                result.source = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                result.text = content;
                break;
            }
        }
    }

    if result.text.is_empty() {
        if let Some(raw) = console {
            result.text = scrape_console_text(raw);
        }
    }

    Ok(result)
}

/// Scrape recognized text out of captured console output.
///
/// Drops blank lines and lines containing any known diagnostic marker;
/// surviving lines keep their original order.
pub fn scrape_console_text(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            !line.trim().is_empty() && !SKIP_MARKERS.iter().any(|marker| line.contains(marker))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_drops_diagnostic_lines() {
        let raw = "\
=====================
image size: 1024x1024
First genuine line.
valid image tokens: 256
Second genuine line.
compression ratio: 12.5

Third genuine line.
output texts tokens (valid): 841
";
        let text = scrape_console_text(raw);
        assert_eq!(
            text,
            "First genuine line.\nSecond genuine line.\nThird genuine line."
        );
    }

    #[test]
    fn scrape_keeps_interleaved_order() {
        let raw = "alpha\ncompression ratio: 9.1\nbeta\ngamma";
        assert_eq!(scrape_console_text(raw), "alpha\nbeta\ngamma");
    }

    #[test]
    fn scrape_of_pure_diagnostics_is_empty() {
        let raw = "=====\ncompression ratio: 3.0\n\n";
        assert_eq!(scrape_console_text(raw), "");
    }

    #[test]
    fn prefers_text_file_over_markdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("result.mmd"), "# markdown").unwrap();
        std::fs::write(dir.path().join("result.txt"), "plain text").unwrap();

        let result = extract_result(dir.path(), None).unwrap();
        assert_eq!(result.text, "plain text");
        assert_eq!(result.source.as_deref(), Some("result.txt"));
    }

    #[test]
    fn skips_empty_text_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "  \n").unwrap();
        std::fs::write(dir.path().join("result.mmd"), "# content").unwrap();

        let result = extract_result(dir.path(), None).unwrap();
        assert_eq!(result.text, "# content");
        assert_eq!(result.source.as_deref(), Some("result.mmd"));
    }

    #[test]
    fn collects_image_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("result.mmd"), "text").unwrap();
        std::fs::write(dir.path().join("result_with_boxes.jpg"), b"\xff\xd8").unwrap();
        std::fs::write(dir.path().join("crop_0.png"), b"\x89PNG").unwrap();

        let mut result = extract_result(dir.path(), None).unwrap();
        result.images.sort();
        assert_eq!(result.images, vec!["crop_0.png", "result_with_boxes.jpg"]);
    }

    #[test]
    fn falls_back_to_console_when_no_files() {
        let dir = tempfile::tempdir().unwrap();

        let result =
            extract_result(dir.path(), Some("recognized\ncompression ratio: 2.0")).unwrap();
        assert_eq!(result.text, "recognized");
        assert!(result.source.is_none());
        assert!(result.images.is_empty());
    }

    #[test]
    fn missing_directory_uses_console() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let result = extract_result(&missing, Some("from console")).unwrap();
        assert_eq!(result.text, "from console");
    }
}
