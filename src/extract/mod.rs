//! Page-image extraction.
//!
//! Every supported input format is reduced to the same intermediate form: a
//! list of numbered page PNGs in a scratch directory. [`ImageExtractor`] is
//! the capability seam — the orchestrator neither knows nor cares whether
//! pages came from a notebook container, a PDF rasteriser, or a plain
//! image. Formats that carry structured annotations (only `.note` today)
//! additionally expose the parsed [`Notebook`] for the rendering context.

pub mod note;
pub mod pdf;
pub mod png;

use crate::error::Note2MdError;
use crate::notebook::Notebook;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Extracts page images from one input format.
#[async_trait]
pub trait ImageExtractor: Send + Sync {
    /// Write one PNG per page into `scratch` and return their paths in page
    /// order. Blocking work (rasterisation, RLE decoding) runs on the
    /// blocking pool.
    async fn extract_images(
        &self,
        input: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, Note2MdError>;

    /// The parsed notebook structure, for formats that have one.
    fn read_notebook(&self, input: &Path) -> Result<Option<Notebook>, Note2MdError>;
}

/// True if the file extension is one the pipeline can convert.
pub fn supported(path: &Path) -> bool {
    matches!(
        extension_of(path).as_deref(),
        Some("note") | Some("pdf") | Some("png")
    )
}

/// Pick the extractor for a path by extension, case-insensitively.
pub fn for_path(path: &Path) -> Result<Box<dyn ImageExtractor>, Note2MdError> {
    match extension_of(path).as_deref() {
        Some("note") => Ok(Box::new(note::NotebookExtractor)),
        Some("pdf") => Ok(Box::new(pdf::PdfExtractor)),
        Some("png") => Ok(Box::new(png::PngExtractor)),
        _ => Err(Note2MdError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// The input's file name without extension, used to derive page image and
/// document names.
pub(crate) fn basename_of(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}

/// Numbered page-image file name, zero-padded to the width of the page
/// count so lexical and page order agree (`notes_07.png` sorts before
/// `notes_10.png`).
pub(crate) fn page_file_name(basename: &str, index: usize, page_count: usize) -> String {
    let width = page_count.to_string().len();
    format!("{basename}_{index:0width$}.png")
}
