//! Healer configuration

use crate::error::{HealError, Result};
use crate::suggest::{OpenAiConfig, SuggesterConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default ledger directory
pub const DEFAULT_LEDGER_DIR: &str = "./data/selectors";

/// Default maximum number of characters of page markup sent to the suggester
pub const DEFAULT_EXCERPT_LIMIT: usize = 5000;

/// Default number of events reported as recent by `stats`
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Context hint used when the caller gives none
pub const DEFAULT_CONTEXT: &str = "General page interaction";

/// One entry of the domain-heuristic table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicRule {
    pub selector: String,
    pub reason: String,
}

impl HeuristicRule {
    pub fn new(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { selector: selector.into(), reason: reason.into() }
    }
}

/// Known-good expressions for TodoMVC-style applications, in priority order
pub fn todomvc_heuristics() -> Vec<HeuristicRule> {
    vec![
        HeuristicRule::new(".new-todo", "TodoMVC new todo input class"),
        HeuristicRule::new("input.new-todo", "TodoMVC new todo input"),
        HeuristicRule::new("input[type=\"text\"]", "Generic text input"),
        HeuristicRule::new("input:not([type])", "Input with no type (defaults to text)"),
        HeuristicRule::new(".toggle", "TodoMVC toggle checkbox class"),
        HeuristicRule::new("input[type=\"checkbox\"]", "Generic checkbox input"),
        HeuristicRule::new(".destroy", "TodoMVC delete button"),
    ]
}

/// Configuration for [`crate::Healer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealerConfig {
    /// When false, any selector that does not match exactly one element
    /// fails without running a strategy
    pub enabled: bool,

    /// Directory owning the healing ledger
    pub ledger_dir: PathBuf,

    /// Characters of page markup handed to the suggester
    pub excerpt_limit: usize,

    /// Events reported as recent by `stats`
    pub recent_window: usize,

    /// Context hint for the suggester when the caller gives none
    pub default_context: String,

    /// Domain-heuristic table, tried in order
    pub heuristics: Vec<HeuristicRule>,

    /// Semantic suggestion provider
    pub suggester: SuggesterConfig,
}

impl Default for HealerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ledger_dir: PathBuf::from(DEFAULT_LEDGER_DIR),
            excerpt_limit: DEFAULT_EXCERPT_LIMIT,
            recent_window: DEFAULT_RECENT_WINDOW,
            default_context: DEFAULT_CONTEXT.to_string(),
            heuristics: todomvc_heuristics(),
            suggester: SuggesterConfig::Disabled,
        }
    }
}

impl HealerConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: switch healing on or off
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method: set the ledger directory
    pub fn ledger_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ledger_dir = dir.into();
        self
    }

    /// Builder method: set the excerpt limit
    pub fn excerpt_limit(mut self, limit: usize) -> Self {
        self.excerpt_limit = limit;
        self
    }

    /// Builder method: set the recent window
    pub fn recent_window(mut self, window: usize) -> Self {
        self.recent_window = window;
        self
    }

    /// Builder method: set the fallback context hint
    pub fn default_context(mut self, context: impl Into<String>) -> Self {
        self.default_context = context.into();
        self
    }

    /// Builder method: replace the domain-heuristic table
    pub fn heuristics(mut self, heuristics: Vec<HeuristicRule>) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Builder method: choose the suggestion provider
    pub fn suggester(mut self, suggester: SuggesterConfig) -> Self {
        self.suggester = suggester;
        self
    }

    /// Defaults overridden by the process environment.
    ///
    /// - `SELF_HEALING_ENABLED`: `true`/`false` (`1`/`0`)
    /// - `SELF_HEALING_LEDGER_DIR`: ledger directory
    /// - `MOCK_LLM=true`: use the offline mock suggester
    /// - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_API_BASE`: OpenAI suggester
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("SELF_HEALING_ENABLED") {
            config.enabled = parse_bool("SELF_HEALING_ENABLED", &value)?;
        }
        if let Some(dir) = lookup("SELF_HEALING_LEDGER_DIR").filter(|d| !d.trim().is_empty()) {
            config.ledger_dir = PathBuf::from(dir);
        }

        let mock = match lookup("MOCK_LLM") {
            Some(value) => parse_bool("MOCK_LLM", &value)?,
            None => false,
        };
        let api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        config.suggester = match (mock, api_key) {
            (true, _) => SuggesterConfig::Mock,
            (false, Some(key)) => {
                let mut openai = OpenAiConfig::new(key);
                if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.trim().is_empty()) {
                    openai = openai.model(model);
                }
                if let Some(base) = lookup("OPENAI_API_BASE").filter(|b| !b.trim().is_empty()) {
                    openai = openai.api_base(base);
                }
                SuggesterConfig::OpenAi(openai)
            }
            (false, None) => SuggesterConfig::Disabled,
        };

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(HealError::Config(format!("{} must be true or false, got '{}'", key, other))),
    }
}
