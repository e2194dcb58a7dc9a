//! Extraction from PDFs via pdfium.
//!
//! pdfium keeps thread-local state and must not run on Tokio worker
//! threads; the whole document is rasterised inside one `spawn_blocking`
//! hop. The longest edge is capped in pixels rather than DPI so an A0
//! export cannot balloon memory, and the cap sits in the size range vision
//! models actually resolve.

use crate::error::Note2MdError;
use crate::extract::{basename_of, page_file_name, ImageExtractor};
use crate::notebook::Notebook;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Longest-edge cap for rasterised pages.
const MAX_RENDERED_PIXELS: i32 = 2048;

pub struct PdfExtractor;

#[async_trait]
impl ImageExtractor for PdfExtractor {
    async fn extract_images(
        &self,
        input: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, Note2MdError> {
        let input = input.to_path_buf();
        let scratch = scratch.to_path_buf();

        tokio::task::spawn_blocking(move || extract_blocking(&input, &scratch))
            .await
            .map_err(|e| Note2MdError::Internal(format!("PDF rasterisation panicked: {e}")))?
    }

    fn read_notebook(&self, _input: &Path) -> Result<Option<Notebook>, Note2MdError> {
        Ok(None)
    }
}

fn extract_blocking(input: &Path, scratch: &Path) -> Result<Vec<PathBuf>, Note2MdError> {
    let pdfium = Pdfium::default();
    let document =
        pdfium
            .load_pdf_from_file(input, None)
            .map_err(|e| Note2MdError::ExtractionFailed {
                path: input.to_path_buf(),
                detail: format!("could not open PDF: {e:?}"),
            })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF {}: {} pages", input.display(), page_count);

    let render_config = PdfRenderConfig::new()
        .set_target_width(MAX_RENDERED_PIXELS)
        .set_maximum_height(MAX_RENDERED_PIXELS);

    let basename = basename_of(input);
    let mut paths = Vec::with_capacity(page_count);

    for index in 0..page_count {
        let page = pages
            .get(index as u16)
            .map_err(|e| Note2MdError::ExtractionFailed {
                path: input.to_path_buf(),
                detail: format!("page {index}: {e:?}"),
            })?;
        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| Note2MdError::ExtractionFailed {
                    path: input.to_path_buf(),
                    detail: format!("page {index}: render failed: {e:?}"),
                })?;
        let image = bitmap.as_image();
        debug!("Rendered page {index} at {}x{} px", image.width(), image.height());

        let path = scratch.join(page_file_name(&basename, index, page_count));
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| Note2MdError::ExtractionFailed {
                path: input.to_path_buf(),
                detail: format!("page {index}: PNG encode failed: {e}"),
            })?;
        paths.push(path);
    }

    Ok(paths)
}
