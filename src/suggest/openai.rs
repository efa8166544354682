//! OpenAI chat-completions suggestion provider

use super::{OpenAiConfig, SuggestionProvider, clean_suggestion};
use crate::error::{HealError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a Playwright selector optimization expert.";

/// Asks a chat model for a more robust locator
pub struct OpenAiSuggester {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiSuggester {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(HealError::Config("missing OpenAI API key".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HealError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn user_prompt(selector: &str, excerpt: &str, context: &str) -> String {
        format!(
            "Analyze this element and suggest a more robust Playwright selector.\n\n\
             Current Selector: {selector}\n\
             Element HTML: {excerpt}\n\
             Context: {context}\n\n\
             Suggest the best selector following Playwright best practices:\n\
             1. Prefer user-facing attributes (role, label, text)\n\
             2. Use data-testid for stable elements\n\
             3. Avoid fragile CSS selectors with generated classes\n\
             4. Ensure uniqueness\n\n\
             Return ONLY the selector string, nothing else."
        )
    }
}

#[async_trait]
impl SuggestionProvider for OpenAiSuggester {
    fn name(&self) -> &str {
        "openai"
    }

    async fn suggest(&self, selector: &str, excerpt: &str, context: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user".to_string(), content: Self::user_prompt(selector, excerpt, context) },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HealError::CollaboratorUnavailable(format!("openai request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(HealError::CollaboratorUnavailable(format!("openai returned {}: {}", status, text)));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| HealError::CollaboratorUnavailable(format!("openai response invalid: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .as_deref()
            .and_then(clean_suggestion)
            .ok_or_else(|| HealError::CollaboratorUnavailable("openai response missing content".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(OpenAiSuggester::new(OpenAiConfig::default()), Err(HealError::Config(_))));
        assert!(OpenAiSuggester::new(OpenAiConfig::new("sk-test")).is_ok());
    }

    #[test]
    fn test_prompt_carries_inputs() {
        let prompt = OpenAiSuggester::user_prompt(".todo-input-broken", "<input class=\"new-todo\">", "Main todo input");
        assert!(prompt.contains("Current Selector: .todo-input-broken"));
        assert!(prompt.contains("Element HTML: <input class=\"new-todo\">"));
        assert!(prompt.contains("Context: Main todo input"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"`[data-testid=\"x\"]`"}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let content = response.choices[0].message.content.as_deref().and_then(clean_suggestion);
        assert_eq!(content.as_deref(), Some("[data-testid=\"x\"]"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let suggester =
            OpenAiSuggester::new(OpenAiConfig::new("sk-test").api_base("http://127.0.0.1:9")).unwrap();
        let err = suggester.suggest(".x", "", "").await.unwrap_err();
        assert!(matches!(err, HealError::CollaboratorUnavailable(_)));
    }
}
