use super::{Candidate, Probe, Strategy};
use crate::error::Result;
use crate::suggest::SuggestionProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Asks the suggestion provider for a replacement, handing it a bounded
/// prefix of the page markup and the context hint
pub struct SemanticStrategy {
    suggester: Arc<dyn SuggestionProvider>,
    excerpt_limit: usize,
    default_context: String,
}

impl SemanticStrategy {
    pub fn new(suggester: Arc<dyn SuggestionProvider>, excerpt_limit: usize, default_context: impl Into<String>) -> Self {
        Self { suggester, excerpt_limit, default_context: default_context.into() }
    }
}

#[async_trait]
impl Strategy for SemanticStrategy {
    fn name(&self) -> &str {
        "semantic"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        if !self.suggester.is_enabled() {
            log::debug!("Suggester '{}' is disabled", self.suggester.name());
            return Ok(None);
        }

        let content = probe.document.content().await?;
        let excerpt: String = content.chars().take(self.excerpt_limit).collect();
        let context = probe.context.unwrap_or(self.default_context.as_str());

        let suggestion = match self.suggester.suggest(probe.selector, &excerpt, context).await {
            Ok(suggestion) => suggestion,
            Err(e) => {
                log::warn!("Suggester '{}' unavailable: {}", self.suggester.name(), e);
                return Ok(None);
            }
        };

        let suggestion = suggestion.trim();
        if suggestion.is_empty() || suggestion == probe.selector {
            return Ok(None);
        }
        if !probe.document.is_unique(suggestion).await {
            log::debug!("Suggested '{}' does not match exactly one element", suggestion);
            return Ok(None);
        }
        Ok(Some(Candidate::new(suggestion, "AI-suggested selector based on page context")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONTEXT;
    use crate::dom::{DomSnapshot, ElementNode};
    use crate::error::HealError;
    use crate::suggest::{DisabledSuggester, MockSuggester};
    use std::sync::Mutex;

    /// Records what it was asked and answers with a fixed expression
    struct Recording {
        answer: &'static str,
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    #[async_trait]
    impl SuggestionProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn suggest(&self, selector: &str, excerpt: &str, context: &str) -> Result<String> {
            self.seen.lock().unwrap().push((selector.to_string(), excerpt.chars().count(), context.to_string()));
            Ok(self.answer.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl SuggestionProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn suggest(&self, _selector: &str, _excerpt: &str, _context: &str) -> Result<String> {
            Err(HealError::CollaboratorUnavailable("timed out".to_string()))
        }
    }

    fn login_page() -> DomSnapshot {
        DomSnapshot::new(
            ElementNode::new("body")
                .child(ElementNode::new("p").with_text("x".repeat(200)))
                .child(ElementNode::new("button").attr("data-testid", ".login-btn").with_text("Log in")),
        )
    }

    #[tokio::test]
    async fn test_mock_suggestion_accepted_when_unique() {
        let doc = login_page();
        let strategy = SemanticStrategy::new(Arc::new(MockSuggester), 5000, DEFAULT_CONTEXT);
        let candidate = strategy.probe(&Probe::new(&doc, ".login-btn", None)).await.unwrap().unwrap();
        assert_eq!(candidate.selector, "[data-testid=\".login-btn\"]");
        assert_eq!(candidate.reason, "AI-suggested selector based on page context");
    }

    #[tokio::test]
    async fn test_excerpt_is_bounded_and_context_defaulted() {
        let doc = login_page();
        let recording = Arc::new(Recording { answer: "button", seen: Mutex::new(Vec::new()) });
        let strategy = SemanticStrategy::new(recording.clone(), 50, DEFAULT_CONTEXT);

        strategy.probe(&Probe::new(&doc, ".login-btn", None)).await.unwrap();
        strategy.probe(&Probe::new(&doc, ".login-btn", Some("Login button"))).await.unwrap();

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen[0], (".login-btn".to_string(), 50, "General page interaction".to_string()));
        assert_eq!(seen[1].2, "Login button");
    }

    #[tokio::test]
    async fn test_ambiguous_suggestion_rejected() {
        let doc = DomSnapshot::new(
            ElementNode::new("body").child(ElementNode::new("p")).child(ElementNode::new("p")),
        );
        let recording = Arc::new(Recording { answer: "p", seen: Mutex::new(Vec::new()) });
        let strategy = SemanticStrategy::new(recording, 5000, DEFAULT_CONTEXT);
        assert_eq!(strategy.probe(&Probe::new(&doc, ".para", None)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_collaborator_has_no_opinion() {
        let doc = login_page();
        let failing = SemanticStrategy::new(Arc::new(Failing), 5000, DEFAULT_CONTEXT);
        assert_eq!(failing.probe(&Probe::new(&doc, ".login-btn", None)).await.unwrap(), None);

        let disabled = SemanticStrategy::new(Arc::new(DisabledSuggester), 5000, DEFAULT_CONTEXT);
        assert_eq!(disabled.probe(&Probe::new(&doc, ".login-btn", None)).await.unwrap(), None);
    }
}
