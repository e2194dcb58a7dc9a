//! Template rendering: build the Tera context and render the three
//! user-facing templates (output path, output file name, document body).
//!
//! Two context tiers exist on purpose. The *basic* context holds only
//! facts knowable before conversion starts (file names, timestamps); the
//! output-path template is rendered from it both when the staleness policy
//! is checked and when the document is written, so the two resolutions can
//! never disagree. The *full* context adds everything produced by the
//! conversion itself — transcript, page images, notebook annotations — and
//! feeds the file-name and body templates.
//!
//! Autoescape is off everywhere: the output is Markdown, not HTML.

use crate::ai::TranscriptionBridge;
use crate::error::Note2MdError;
use crate::extract::note::render_title_png;
use crate::notebook::Notebook;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

/// A page image as seen by the document template.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    /// File name, e.g. `meeting_03.png`.
    pub name: String,
    /// Path relative to the generated document (same directory, so this is
    /// the file name) — what Markdown links should use.
    pub rel_path: String,
    /// Final absolute location of the image.
    pub abs_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordView {
    pub page_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleView {
    pub page_number: usize,
    pub level: u32,
    /// Transcribed text of the handwritten title region.
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub page_number: usize,
    pub link_type: String,
    pub direction: String,
    pub target: String,
}

/// Context available before any conversion work: names and timestamps of
/// the input file.
pub fn basic_context(input: &Path) -> Result<Context, Note2MdError> {
    let meta = std::fs::metadata(input).map_err(|e| Note2MdError::io(input, e))?;
    let mtime: chrono::DateTime<chrono::Local> = meta
        .modified()
        .map_err(|e| Note2MdError::io(input, e))?
        .into();
    // Creation time is not available on every filesystem; fall back to mtime.
    let ctime: chrono::DateTime<chrono::Local> =
        meta.created().map(Into::into).unwrap_or(mtime);

    let mut context = Context::new();
    context.insert("file_basename", &crate::extract::basename_of(input));
    context.insert(
        "file_name",
        &input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    context.insert("ctime", &ctime.format("%Y-%m-%d %H:%M:%S").to_string());
    context.insert("mtime", &mtime.format("%Y-%m-%d %H:%M:%S").to_string());
    context.insert("year_month_day", &ctime.format("%Y-%m-%d").to_string());
    context.insert("year", &ctime.format("%Y").to_string());
    context.insert("month", &ctime.format("%m").to_string());
    context.insert("day", &ctime.format("%d").to_string());
    Ok(context)
}

/// Extend a basic context with everything the conversion produced.
pub fn full_context(
    basic: &Context,
    markdown: &str,
    images: &[ImageRef],
    keywords: &[KeywordView],
    titles: &[TitleView],
    links: &[LinkView],
) -> Context {
    let mut context = basic.clone();
    context.insert("markdown", markdown);
    // Older templates used `llm_output`; keep both names working.
    context.insert("llm_output", markdown);
    context.insert("images", images);
    context.insert("keywords", keywords);
    context.insert("titles", titles);
    context.insert("links", links);
    context
}

/// Project a parsed notebook's annotations into template-facing views.
///
/// Titles are handwritten bitmaps, so each one costs a vision-model call;
/// keywords and links are plain data and cost nothing.
pub async fn project_notebook(
    input: &Path,
    notebook: &Notebook,
    bridge: &dyn TranscriptionBridge,
) -> Result<(Vec<KeywordView>, Vec<TitleView>, Vec<LinkView>), Note2MdError> {
    let keywords = notebook
        .keywords
        .iter()
        .map(|k| KeywordView {
            page_number: k.page_number,
            content: k.content.clone(),
        })
        .collect();

    let mut titles = Vec::with_capacity(notebook.titles.len());
    for title in &notebook.titles {
        let png = render_title_png(input, title)?;
        let content = bridge.transcribe_title(&png).await?;
        titles.push(TitleView {
            page_number: title.page_number,
            level: title.level,
            content,
        });
    }

    let links = notebook
        .links
        .iter()
        .map(|l| LinkView {
            page_number: l.page_number,
            link_type: l.link_type.as_str().to_string(),
            direction: l.direction.as_str().to_string(),
            target: String::from_utf8_lossy(&l.target).into_owned(),
        })
        .collect();

    Ok((keywords, titles, links))
}

/// Render one of the user-configurable templates. `which` names the
/// template in error messages ("template", "output_path_template", …).
pub fn render_template(
    which: &str,
    template: &str,
    context: &Context,
) -> Result<String, Note2MdError> {
    Tera::one_off(template, context, false).map_err(|e| Note2MdError::Template {
        which: which.to_string(),
        source: e,
    })
}
