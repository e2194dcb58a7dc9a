//! Vision-model transcription.
//!
//! [`TranscriptionBridge`] is the seam between the orchestrator and the
//! model: production code uses [`VisionBridge`] over an `edgequake-llm`
//! provider, tests substitute a scripted fake. The bridge is intentionally
//! thin — prompt text lives in configuration, page sequencing in the
//! orchestrator, and retry behaviour in the provider; this module only
//! builds messages and returns the model's Markdown.
//!
//! Images travel as base64 PNG with `detail: "high"` — handwriting needs
//! the full tile budget or thin strokes are lost.

use crate::config::Config;
use crate::error::Note2MdError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Transcribes page images and title crops to text.
#[async_trait]
pub trait TranscriptionBridge: Send + Sync {
    /// Transcribe one full page image to Markdown. `context` is the tail of
    /// the transcript accumulated from earlier pages (empty on page one).
    async fn transcribe_page(&self, image: &Path, context: &str) -> Result<String, Note2MdError>;

    /// Transcribe a cropped title region (PNG bytes) to a short plain string.
    async fn transcribe_title(&self, png: &[u8]) -> Result<String, Note2MdError>;
}

/// Production bridge over an `edgequake-llm` vision provider.
pub struct VisionBridge {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    title_prompt: String,
}

impl VisionBridge {
    /// Resolve a provider from configuration and environment.
    ///
    /// Resolution order:
    /// 1. `OPENAI_API_KEY` in the environment → the OpenAI provider with the
    ///    configured model. A config-file `api_key` is exported first when
    ///    the environment has none, so both spellings reach the same path.
    /// 2. Otherwise [`ProviderFactory::from_env`] auto-detects from whatever
    ///    provider keys are present.
    pub fn from_config(config: &Config) -> Result<Self, Note2MdError> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            if let Some(key) = &config.api_key {
                std::env::set_var("OPENAI_API_KEY", key);
            }
        }

        let provider: Arc<dyn LLMProvider> = if std::env::var("OPENAI_API_KEY").is_ok() {
            ProviderFactory::create_llm_provider("openai", &config.model).map_err(|e| {
                Note2MdError::ProviderNotConfigured {
                    provider: "openai".to_string(),
                    hint: format!("{e}"),
                }
            })?
        } else {
            let (provider, _embedding) =
                ProviderFactory::from_env().map_err(|e| Note2MdError::ProviderNotConfigured {
                    provider: "auto".to_string(),
                    hint: format!(
                        "No vision provider could be auto-detected from the environment.\n\
                         Set OPENAI_API_KEY (or another provider's key), or put api_key in \
                         the config file.\nDetail: {e}"
                    ),
                })?;
            provider
        };

        Ok(VisionBridge::with_provider(provider, config))
    }

    /// Wrap a pre-constructed provider. Used when the caller already holds
    /// one (custom middleware, tests against a local model).
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &Config) -> Self {
        VisionBridge {
            provider,
            prompt: config.prompt.clone(),
            title_prompt: config.title_prompt.clone(),
        }
    }

    async fn chat_with_image(
        &self,
        prompt: &str,
        image: ImageData,
    ) -> Result<String, Note2MdError> {
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
        let options = CompletionOptions {
            temperature: Some(0.1),
            max_tokens: Some(4096),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| Note2MdError::Transcription {
                detail: format!("{e}"),
            })?;
        debug!(
            "Transcribed: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

#[async_trait]
impl TranscriptionBridge for VisionBridge {
    async fn transcribe_page(&self, image: &Path, context: &str) -> Result<String, Note2MdError> {
        let bytes = std::fs::read(image).map_err(|e| Note2MdError::io(image, e))?;
        let prompt = fill_context(&self.prompt, context);
        self.chat_with_image(&prompt, encode_png(&bytes)).await
    }

    async fn transcribe_title(&self, png: &[u8]) -> Result<String, Note2MdError> {
        let text = self.chat_with_image(&self.title_prompt, encode_png(png)).await?;
        Ok(text.trim().to_string())
    }
}

/// Substitute the `{context}` placeholder in a transcription prompt.
///
/// Plain string substitution, not templating: note content must never be
/// interpreted as template syntax.
pub fn fill_context(prompt: &str, context: &str) -> String {
    prompt.replace("{context}", context)
}

/// Wrap PNG bytes as a base64 image attachment for the vision API.
fn encode_png(png: &[u8]) -> ImageData {
    ImageData::new(STANDARD.encode(png), "image/png").with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_context_substitutes_placeholder() {
        let prompt = "Previous page ended with:\n{context}\nContinue.";
        let filled = fill_context(prompt, "…and therefore");
        assert_eq!(filled, "Previous page ended with:\n…and therefore\nContinue.");
    }

    #[test]
    fn fill_context_with_empty_context() {
        assert_eq!(fill_context("ctx: {context}!", ""), "ctx: !");
    }

    #[test]
    fn fill_context_without_placeholder_is_identity() {
        assert_eq!(fill_context("no placeholder", "ignored"), "no placeholder");
    }

    #[test]
    fn encode_png_produces_valid_base64() {
        let data = encode_png(b"\x89PNG\r\n\x1a\n fake");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).unwrap();
        assert_eq!(&decoded[..4], b"\x89PNG");
    }
}
