//! The conversion orchestrator.
//!
//! `convert_file` runs the whole pipeline for one input: resolve the output
//! location, consult the staleness policy, extract page images into a
//! scratch directory, transcribe the pages sequentially with context
//! chaining, move images next to the document, render the templates, write
//! the document atomically, and record the conversion in the sidecar.
//!
//! Pages are transcribed strictly in order because each page's prompt
//! carries the tail of the transcript so far — parallelising pages would
//! sever the very continuity the context exists to provide. Whole *files*
//! are independent, but directory mode also runs them sequentially to keep
//! API pressure predictable.
//!
//! The sidecar is written last, only after the document and its images have
//! reached their final paths: a crash anywhere earlier leaves no record, so
//! the next run simply converts again.

use crate::ai::TranscriptionBridge;
use crate::config::Config;
use crate::error::Note2MdError;
use crate::extract::{self, ImageExtractor};
use crate::metadata;
use crate::policy::{self, Decision};
use crate::progress::ConvertProgress;
use crate::render::{self, ImageRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Number of transcript characters carried into the next page's prompt.
const CONTEXT_CHARS: usize = 50;

/// Per-invocation knobs.
#[derive(Default)]
pub struct ConvertOptions {
    /// Bypass the staleness policy entirely.
    pub force: bool,
    /// Optional progress sink; `None` reports nothing.
    pub progress: Option<Arc<dyn ConvertProgress>>,
}

/// Convert one input file; returns the path of the generated document.
///
/// Refusals from the staleness policy come back as
/// [`Note2MdError::InputUnchanged`] / [`Note2MdError::OutputTampered`];
/// callers distinguish them with [`Note2MdError::is_refusal`].
pub async fn convert_file(
    extractor: &dyn ImageExtractor,
    bridge: &dyn TranscriptionBridge,
    input: &Path,
    output_root: &Path,
    config: &Config,
    options: &ConvertOptions,
) -> Result<PathBuf, Note2MdError> {
    if !input.exists() {
        return Err(Note2MdError::FileNotFound {
            path: input.to_path_buf(),
        });
    }

    // The output directory is derived from the basic context alone, so this
    // resolution and the one implied by the sidecar can never diverge.
    let basic = render::basic_context(input)?;
    let rel_dir = render::render_template(
        "output_path_template",
        &config.output_path_template,
        &basic,
    )?;
    let output_dir = output_root.join(rel_dir.trim());

    if let Decision::Refuse(reason) = policy::should_convert(&output_dir, options.force)? {
        return Err(reason.into_error());
    }
    if options.force {
        debug!("--force: skipping staleness checks for {}", input.display());
    }

    std::fs::create_dir_all(&output_dir).map_err(|e| Note2MdError::io(&output_dir, e))?;

    // Scratch lives under the output root so the final renames never cross
    // a filesystem boundary; the TempDir guard removes it on every exit path.
    let scratch = tempfile::Builder::new()
        .prefix(".note2md-")
        .tempdir_in(output_root)
        .map_err(|e| Note2MdError::io(output_root, e))?;

    let page_images = extractor.extract_images(input, scratch.path()).await?;
    if let Some(progress) = &options.progress {
        progress.on_file_start(input, page_images.len());
    }
    info!(
        "Converting {} ({} pages) into {}",
        input.display(),
        page_images.len(),
        output_dir.display()
    );

    // Sequential transcription with context chaining.
    let mut transcript = String::new();
    for (index, image) in page_images.iter().enumerate() {
        let context = trailing_chars(&transcript, CONTEXT_CHARS);
        let page_md = bridge.transcribe_page(image, context).await?;
        if index == 0 {
            transcript = page_md;
        } else {
            transcript.push('\n');
            transcript.push_str(&page_md);
        }
        if let Some(progress) = &options.progress {
            progress.on_page_transcribed(index, page_images.len());
        }
    }

    // Page images move next to the document only once every page
    // transcribed; a mid-run failure leaves the output directory untouched.
    let mut images = Vec::with_capacity(page_images.len());
    for scratch_path in &page_images {
        let name = scratch_path
            .file_name()
            .ok_or_else(|| Note2MdError::Internal("page image has no file name".into()))?
            .to_string_lossy()
            .into_owned();
        let final_path = output_dir.join(&name);
        std::fs::rename(scratch_path, &final_path)
            .map_err(|e| Note2MdError::io(&final_path, e))?;
        images.push(ImageRef {
            rel_path: name.clone(),
            name,
            abs_path: final_path,
        });
    }

    let (keywords, titles, links) = match extractor.read_notebook(input)? {
        Some(notebook) => render::project_notebook(input, &notebook, bridge).await?,
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let full = render::full_context(&basic, &transcript, &images, &keywords, &titles, &links);
    let file_name = render::render_template(
        "output_filename_template",
        &config.output_filename_template,
        &full,
    )?;
    let output_file = output_dir.join(file_name.trim());
    let body = render::render_template("template", &config.template, &full)?;

    write_atomically(&output_file, &body)?;
    metadata::write(input, &output_file)?;

    if let Some(progress) = &options.progress {
        progress.on_file_complete(input, &output_file);
    }
    Ok(output_file)
}

/// Convert every supported file under `directory`, skipping refusals.
///
/// Returns the documents actually generated, in path order. Unsupported
/// extensions are silently ignored; refusals are logged and skipped; any
/// other error aborts the batch.
pub async fn convert_directory(
    bridge: &dyn TranscriptionBridge,
    directory: &Path,
    output_root: &Path,
    config: &Config,
    options: &ConvertOptions,
) -> Result<Vec<PathBuf>, Note2MdError> {
    if !directory.is_dir() {
        return Err(Note2MdError::FileNotFound {
            path: directory.to_path_buf(),
        });
    }

    let mut inputs = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| directory.to_path_buf());
            Note2MdError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() && extract::supported(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();

    let mut outputs = Vec::new();
    for input in inputs {
        let extractor = extract::for_path(&input)?;
        match convert_file(
            extractor.as_ref(),
            bridge,
            &input,
            output_root,
            config,
            options,
        )
        .await
        {
            Ok(output) => outputs.push(output),
            Err(Note2MdError::InputUnchanged { input }) => {
                debug!("Skipping {} (unchanged since last run)", input.display());
            }
            Err(Note2MdError::OutputTampered { output }) => {
                warn!(
                    "Skipping {}: output {} was hand-edited; use --force to overwrite",
                    input.display(),
                    output.display()
                );
            }
            Err(other) => return Err(other),
        }
    }
    Ok(outputs)
}

/// Write via a temp file in the same directory, then rename over the final
/// path, so readers never observe a half-written document.
fn write_atomically(path: &Path, content: &str) -> Result<(), Note2MdError> {
    let dir = path.parent().ok_or_else(|| {
        Note2MdError::Internal(format!("output path '{}' has no parent", path.display()))
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        Note2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    std::io::Write::write_all(&mut tmp, content.as_bytes()).map_err(|e| {
        Note2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    tmp.persist(path)
        .map_err(|e| Note2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

/// Last `n` characters of `s`, respecting char boundaries.
fn trailing_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = s
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}
