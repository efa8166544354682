use super::{Candidate, Probe, Strategy, prefer, push_unique, shares_keyword};
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

/// Finds a form field by its placeholder text.
///
/// Placeholders that share a keyword with the failing expression or the
/// context are tried before the others.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderStrategy;

#[async_trait]
impl Strategy for PlaceholderStrategy {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        let keywords = locator::keywords(&probe.combined_text());

        let mut placeholders = Vec::new();
        for field in probe.document.query_all("input, textarea").await? {
            if let Some(placeholder) = field.non_empty_attribute("placeholder") {
                push_unique(&mut placeholders, placeholder);
            }
        }

        for placeholder in prefer(placeholders, |p| shares_keyword(p, &keywords)) {
            let selector = locator::placeholder(&placeholder);
            if probe.document.is_unique(&selector).await {
                return Ok(Some(Candidate::new(
                    selector,
                    format!("Found input using placeholder: \"{}\"", placeholder),
                )));
            }
        }
        Ok(None)
    }
}
