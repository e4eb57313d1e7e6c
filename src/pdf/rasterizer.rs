//! PDF rasterization
//!
//! Renders every page of a PDF to a PNG file at a target DPI. MuPDF is
//! CPU-bound and not async-safe, so the blocking implementation runs on the
//! tokio blocking thread pool.

use std::path::{Path, PathBuf};

use mupdf::{Colorspace, Document, Matrix};

use super::{DocumentError, DocumentResult};

/// PDF user-space baseline resolution
const BASE_DPI: f32 = 72.0;

/// Rasterize every page of a PDF into PNG files.
///
/// Page images are written next to the source file, named
/// `{source_stem}_page_{n}.png` with 1-based page numbers. Returns the page
/// image paths in page order.
pub async fn rasterize_pdf(pdf_path: &Path, dpi: f32) -> DocumentResult<Vec<PathBuf>> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || rasterize_pdf_blocking(&path, dpi))
        .await
        .map_err(|e| DocumentError::ThreadPoolError(format!("Raster task join error: {}", e)))?
}

/// Blocking implementation of page rasterization.
///
/// The document handle is dropped when this function returns, on success and
/// on every error path.
pub fn rasterize_pdf_blocking(pdf_path: &Path, dpi: f32) -> DocumentResult<Vec<PathBuf>> {
    let path_str = pdf_path.to_string_lossy();

    let doc = Document::open(&path_str)
        .map_err(|e| DocumentError::ParseError(format!("{}: {}", path_str, e)))?;
    let page_count = doc.page_count()? as usize;

    let zoom = dpi / BASE_DPI;
    let matrix = Matrix::new_scale(zoom, zoom);
    let colorspace = Colorspace::device_rgb();

    let parent = pdf_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    tracing::debug!(path = %path_str, pages = page_count, dpi = dpi, "Rasterizing PDF");

    let mut page_paths = Vec::with_capacity(page_count);

    for index in 0..page_count {
        let page = doc.load_page(index as i32)?;

        // Opaque RGB output: no alpha channel
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        let png = encode_pixmap_png(&pixmap)?;

        let page_path = parent.join(format!("{}_page_{}.png", stem, index + 1));
        std::fs::write(&page_path, png)?;
        page_paths.push(page_path);
    }

    Ok(page_paths)
}

/// Encode a MuPDF pixmap as PNG.
fn encode_pixmap_png(pixmap: &mupdf::Pixmap) -> DocumentResult<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    // Copy samples into a packed RGB buffer (the pixmap may carry extra
    // components per pixel)
    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(255);
            let b = samples.get(offset + 2).copied().unwrap_or(255);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| DocumentError::ImageError("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| DocumentError::ImageError(e.to_string()))?;

    Ok(output)
}
