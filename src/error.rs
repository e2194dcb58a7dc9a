//! Error types for the note2md library.
//!
//! One enum covers the whole pipeline, but two variants are special:
//! [`Note2MdError::InputUnchanged`] and [`Note2MdError::OutputTampered`] are
//! *refusals* from the staleness policy, not defects. Directory-mode batch
//! processing catches them (via [`Note2MdError::is_refusal`]) and moves on to
//! the next file; everything else aborts the batch.
//!
//! `InputUnchanged` is the steady state of an idempotent re-run and is logged
//! at debug level. `OutputTampered` means someone hand-edited a generated
//! document and reconverting would destroy their edits — it is always
//! surfaced loudly, and only `--force` overrides it.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the note2md library.
#[derive(Debug, Error)]
pub enum Note2MdError {
    // ── Staleness-policy refusals ─────────────────────────────────────────
    /// The input has not changed since the last successful conversion.
    /// A skip signal, not a defect.
    #[error("Input '{input}' has NOT changed since the last conversion.\nUse --force to reprocess anyway.")]
    InputUnchanged { input: PathBuf },

    /// The generated output was modified out-of-band after conversion.
    /// Reconverting would silently discard those edits.
    #[error("Output '{output}' HAS been changed since it was generated.\nRefusing to overwrite; use --force to reprocess and discard the edits.")]
    OutputTampered { output: PathBuf },

    // ── Metadata errors ───────────────────────────────────────────────────
    /// The sidecar metadata file exists but cannot be parsed.
    #[error("Metadata file '{path}' is corrupt: {detail}\nDelete it to treat the output as never converted, or rerun with --force.")]
    CorruptMetadata { path: PathBuf, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file extension is not one of .note, .pdf, .png.
    #[error("Unsupported file format: '{path}'\nSupported extensions: .note, .pdf, .png")]
    UnsupportedFormat { path: PathBuf },

    /// The Supernote container is malformed or truncated.
    #[error("Failed to parse notebook '{path}': {detail}")]
    NotebookParse { path: PathBuf, detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Page-image extraction failed for this input.
    #[error("Failed to extract page images from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// The vision model call failed.
    #[error("Transcription failed: {detail}")]
    Transcription { detail: String },

    /// One of the user-configurable Tera templates failed to render.
    #[error("Template '{which}' failed to render: {source}")]
    Template {
        which: String,
        #[source]
        source: tera::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// General I/O failure on a specific path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration errors ──────────────────────────────────────────────
    /// The configuration file exists but cannot be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No vision-capable LLM provider could be resolved.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Note2MdError {
    /// True for staleness-policy refusals that batch mode skips over.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Note2MdError::InputUnchanged { .. } | Note2MdError::OutputTampered { .. }
        )
    }

    /// Shorthand for wrapping an I/O error with its path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Note2MdError::Io {
            path: path.into(),
            source,
        }
    }
}
