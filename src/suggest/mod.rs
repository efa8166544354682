//! Semantic selector suggestions
//!
//! The last strategy of the chain asks an external collaborator for a
//! replacement locator. Which collaborator is used is an explicit
//! [`SuggesterConfig`] value handed to the healer; nothing here reads the
//! process environment.

#[cfg(feature = "openai")]
pub mod openai;

use crate::error::{HealError, Result};
use crate::locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "openai")]
pub use openai::OpenAiSuggester;

/// Default model for the OpenAI provider
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default API base for the OpenAI provider
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Source of replacement locators
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether asking is worthwhile at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Propose a locator for the element `selector` was meant to find.
    ///
    /// `excerpt` is a bounded prefix of the page markup and `context` a free
    /// text description of the element's purpose.
    async fn suggest(&self, selector: &str, excerpt: &str, context: &str) -> Result<String>;
}

/// Connection settings for the OpenAI chat-completions provider
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.1,
            max_tokens: 100,
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Default::default() }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which suggestion provider the healer uses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SuggesterConfig {
    /// No collaborator; the semantic strategy never has an opinion
    #[default]
    Disabled,
    /// Offline stand-in returning a `data-testid` guess
    Mock,
    /// OpenAI chat completions (requires the `openai` feature)
    #[serde(rename = "openai")]
    OpenAi(OpenAiConfig),
}

/// Build the provider described by `config`
pub fn build_suggester(config: &SuggesterConfig) -> Result<Arc<dyn SuggestionProvider>> {
    match config {
        SuggesterConfig::Disabled => Ok(Arc::new(DisabledSuggester)),
        SuggesterConfig::Mock => Ok(Arc::new(MockSuggester)),
        #[cfg(feature = "openai")]
        SuggesterConfig::OpenAi(openai) => Ok(Arc::new(OpenAiSuggester::new(openai.clone())?)),
        #[cfg(not(feature = "openai"))]
        SuggesterConfig::OpenAi(_) => Err(HealError::Config(
            "OpenAI suggestions require the `openai` feature".to_string(),
        )),
    }
}

/// Provider that is always unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSuggester;

#[async_trait]
impl SuggestionProvider for DisabledSuggester {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn suggest(&self, _selector: &str, _excerpt: &str, _context: &str) -> Result<String> {
        Err(HealError::CollaboratorUnavailable("semantic suggestions are disabled".to_string()))
    }
}

/// Offline provider: assumes the element carries `data-testid="<selector>"`
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSuggester;

#[async_trait]
impl SuggestionProvider for MockSuggester {
    fn name(&self) -> &str {
        "mock"
    }

    async fn suggest(&self, selector: &str, _excerpt: &str, _context: &str) -> Result<String> {
        Ok(locator::attribute("data-testid", selector))
    }
}

/// Clean up a model answer: drop code fences, backticks and wrapping quotes
pub fn clean_suggestion(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // skip the language tag on the opening fence
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
        text = text.trim_end().strip_suffix("```").unwrap_or(text);
    }
    let mut text = text.trim();
    for quote in ['`', '\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = text[1..text.len() - 1].trim();
        }
    }
    let line = text.lines().next().unwrap_or_default().trim();
    (!line.is_empty()).then(|| line.to_string())
}
