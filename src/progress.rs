//! Progress reporting hooks.
//!
//! The library never prints; callers that want progress (the CLI's
//! indicatif bars, a GUI, tests) implement [`ConvertProgress`] and pass it
//! in through `ConvertOptions`. All methods have empty default bodies so an
//! implementor only overrides what it displays.

use std::path::Path;

/// Callbacks fired by the conversion orchestrator.
///
/// Methods are called from async context and must not block.
pub trait ConvertProgress: Send + Sync {
    /// A file's conversion started; `page_count` pages will be transcribed.
    fn on_file_start(&self, _input: &Path, _page_count: usize) {}

    /// One page finished transcription (`page` is 0-based).
    fn on_page_transcribed(&self, _page: usize, _page_count: usize) {}

    /// The document was written and its metadata recorded.
    fn on_file_complete(&self, _input: &Path, _output: &Path) {}
}

/// A [`ConvertProgress`] that reports nothing.
pub struct NoopProgress;

impl ConvertProgress for NoopProgress {}
