//! User configuration: prompts, templates, model, and API key.
//!
//! Loaded from a TOML file where every key is optional; anything absent
//! falls back to the defaults in [`crate::prompts`]. A missing file is not
//! an error — first-run users get a fully working default configuration —
//! but a file that exists and fails to parse is rejected loudly rather than
//! silently ignored.

use crate::error::Note2MdError;
use crate::prompts;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Resolved configuration with every field populated.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-page transcription prompt; must contain a `{context}` placeholder.
    pub prompt: String,
    /// Prompt for transcribing cropped title regions.
    pub title_prompt: String,
    /// Tera template for the generated Markdown document.
    pub template: String,
    /// Tera template for the output directory, relative to the output root.
    pub output_path_template: String,
    /// Tera template for the generated document's file name.
    pub output_filename_template: String,
    /// Vision model name, passed to the provider.
    pub model: String,
    /// API key to export as `OPENAI_API_KEY` if the environment lacks one.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: prompts::DEFAULT_PROMPT.to_string(),
            title_prompt: prompts::DEFAULT_TITLE_PROMPT.to_string(),
            template: prompts::DEFAULT_MD_TEMPLATE.to_string(),
            output_path_template: prompts::DEFAULT_OUTPUT_PATH_TEMPLATE.to_string(),
            output_filename_template: prompts::DEFAULT_OUTPUT_FILENAME_TEMPLATE.to_string(),
            model: prompts::DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

/// On-disk shape: all keys optional, unknown keys rejected so typos
/// ("templte") fail instead of silently using a default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    prompt: Option<String>,
    title_prompt: Option<String>,
    template: Option<String>,
    output_path_template: Option<String>,
    output_filename_template: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    /// Deprecated alias for `api_key`, kept for old config files.
    openai_api_key: Option<String>,
}

impl Config {
    /// Load configuration from `path`, layering file values over defaults.
    pub fn load(path: &Path) -> Result<Config, Note2MdError> {
        let raw_text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}; using defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(Note2MdError::io(path, e)),
        };

        let raw: RawConfig = toml::from_str(&raw_text).map_err(|e| {
            Note2MdError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;

        let mut config = Config::default();
        if let Some(v) = raw.prompt {
            config.prompt = v;
        }
        if let Some(v) = raw.title_prompt {
            config.title_prompt = v;
        }
        if let Some(v) = raw.template {
            config.template = v;
        }
        if let Some(v) = raw.output_path_template {
            config.output_path_template = v;
        }
        if let Some(v) = raw.output_filename_template {
            config.output_filename_template = v;
        }
        if let Some(v) = raw.model {
            config.model = v;
        }
        config.api_key = match (raw.api_key, raw.openai_api_key) {
            (Some(key), _) => Some(key),
            (None, Some(key)) => {
                warn!("Config key 'openai_api_key' is deprecated; rename it to 'api_key'");
                Some(key)
            }
            (None, None) => None,
        };

        if !config.prompt.contains("{context}") {
            warn!("Configured prompt has no {{context}} placeholder; page-to-page continuity is lost");
        }

        Ok(config)
    }
}
