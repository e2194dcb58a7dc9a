//! Extraction from Supernote `.note` containers.
//!
//! Parsing and RLE decoding are pure CPU work on an in-memory buffer, so
//! the whole extraction runs on the blocking pool in one hop: read, parse,
//! decode every page, encode PNGs.

use crate::error::Note2MdError;
use crate::extract::{basename_of, page_file_name, ImageExtractor};
use crate::notebook::{decode, Notebook, Title};
use async_trait::async_trait;
use image::GrayImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct NotebookExtractor;

#[async_trait]
impl ImageExtractor for NotebookExtractor {
    async fn extract_images(
        &self,
        input: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, Note2MdError> {
        let input = input.to_path_buf();
        let scratch = scratch.to_path_buf();

        tokio::task::spawn_blocking(move || extract_blocking(&input, &scratch))
            .await
            .map_err(|e| Note2MdError::Internal(format!("notebook extraction panicked: {e}")))?
    }

    fn read_notebook(&self, input: &Path) -> Result<Option<Notebook>, Note2MdError> {
        Ok(Some(load(input)?))
    }
}

/// Read and parse a notebook container from disk.
pub fn load(input: &Path) -> Result<Notebook, Note2MdError> {
    let data = std::fs::read(input).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Note2MdError::FileNotFound {
                path: input.to_path_buf(),
            }
        } else {
            Note2MdError::io(input, e)
        }
    })?;
    Notebook::parse(&data).map_err(|e| Note2MdError::NotebookParse {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })
}

fn extract_blocking(input: &Path, scratch: &Path) -> Result<Vec<PathBuf>, Note2MdError> {
    let notebook = load(input)?;
    let basename = basename_of(input);
    let page_count = notebook.pages.len();
    debug!(
        "Notebook {}: {} pages at {}x{}",
        input.display(),
        page_count,
        notebook.width,
        notebook.height
    );

    let mut paths = Vec::with_capacity(page_count);
    for (index, page) in notebook.pages.iter().enumerate() {
        let pixels = decode::decode(&page.rle, notebook.width, notebook.height).map_err(|e| {
            Note2MdError::ExtractionFailed {
                path: input.to_path_buf(),
                detail: format!("page {index}: {e}"),
            }
        })?;
        let image = gray_image(pixels, notebook.width, notebook.height, input)?;

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

/// Decode a title's cropped bitmap and encode it as in-memory PNG bytes,
/// ready for the vision model.
pub fn render_title_png(input: &Path, title: &Title) -> Result<Vec<u8>, Note2MdError> {
    let (_, _, width, height) = title.rect;
    let pixels =
        decode::decode(&title.rle, width, height).map_err(|e| Note2MdError::ExtractionFailed {
            path: input.to_path_buf(),
            detail: format!("title on page {}: {e}", title.page_number),
        })?;
    let image = gray_image(pixels, width, height, input)?;

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Note2MdError::ExtractionFailed {
            path: input.to_path_buf(),
            detail: format!("title PNG encode failed: {e}"),
        })?;
    Ok(buf)
}

fn gray_image(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    input: &Path,
) -> Result<GrayImage, Note2MdError> {
    GrayImage::from_raw(width, height, pixels).ok_or_else(|| Note2MdError::ExtractionFailed {
        path: input.to_path_buf(),
        detail: format!("decoded pixel buffer does not fit {width}x{height}"),
    })
}
