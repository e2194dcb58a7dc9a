//! Extraction from standalone PNG images: a single-page "document".
//!
//! The image is copied into the scratch directory under the numbered-page
//! naming scheme so the rest of the pipeline sees exactly the same shape as
//! a one-page notebook.

use crate::error::Note2MdError;
use crate::extract::{basename_of, page_file_name, ImageExtractor};
use crate::notebook::Notebook;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct PngExtractor;

#[async_trait]
impl ImageExtractor for PngExtractor {
    async fn extract_images(
        &self,
        input: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, Note2MdError> {
        if !input.exists() {
            return Err(Note2MdError::FileNotFound {
                path: input.to_path_buf(),
            });
        }
        let target = scratch.join(page_file_name(&basename_of(input), 0, 1));
        tokio::fs::copy(input, &target)
            .await
            .map_err(|e| Note2MdError::io(input, e))?;
        Ok(vec![target])
    }

    fn read_notebook(&self, _input: &Path) -> Result<Option<Notebook>, Note2MdError> {
        Ok(None)
    }
}
