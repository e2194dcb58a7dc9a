//! # note2md
//!
//! Convert Supernote notebooks (and PDFs / PNGs) to Markdown using Vision
//! Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Handwriting on an e-ink tablet is trapped in a proprietary container.
//! This crate decodes the `.note` format directly, renders each page to a
//! PNG, and lets a VLM transcribe it — producing Markdown that keeps
//! headings, lists, and math intact, with the original page images linked
//! alongside.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .note / .pdf / .png
//!  │
//!  ├─ 1. Policy     staleness check against the sidecar record
//!  ├─ 2. Extract    pages → numbered PNGs in a scratch directory
//!  ├─ 3. Transcribe sequential VLM calls, each primed with the tail of
//!  │                the transcript so far (context chaining)
//!  ├─ 4. Project    notebook keywords / titles / links into the context
//!  ├─ 5. Render     Tera templates: output path, file name, document body
//!  └─ 6. Record     atomic document write + sidecar metadata
//! ```
//!
//! ## Incremental conversion
//!
//! Every output directory carries a hidden sidecar
//! (`.note2md.metadata.yaml`) holding content hashes of the input and the
//! generated document. Re-running against an unchanged input is a cheap
//! no-op; reconverting over a hand-edited output is refused unless forced.
//! See [`policy`] for the exact rules.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use note2md::{Config, ConvertOptions, VisionBridge};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY etc.
//!     let config = Config::default();
//!     let bridge = VisionBridge::from_config(&config)?;
//!     let input = Path::new("20240511_142049.note");
//!     let extractor = note2md::extract::for_path(input)?;
//!     let output = note2md::convert_file(
//!         extractor.as_ref(),
//!         &bridge,
//!         input,
//!         Path::new("supernote"),
//!         &config,
//!         &ConvertOptions::default(),
//!     )
//!     .await?;
//!     println!("{}", output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `note2md` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! note2md = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ai;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod hash;
pub mod metadata;
pub mod notebook;
pub mod policy;
pub mod progress;
pub mod prompts;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ai::{TranscriptionBridge, VisionBridge};
pub use config::Config;
pub use convert::{convert_directory, convert_file, ConvertOptions};
pub use error::Note2MdError;
pub use extract::ImageExtractor;
pub use metadata::{ConversionMetadata, SIDECAR_FILENAME};
pub use notebook::Notebook;
pub use policy::{should_convert, Decision, RefuseReason};
pub use progress::{ConvertProgress, NoopProgress};
