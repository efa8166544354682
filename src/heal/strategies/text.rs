use super::{Candidate, Probe, Strategy};
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

/// Elements whose visible text is worth matching on
const TEXT_CARRIERS: &str = "button, a, input, label, span, div";

/// Shortest text considered meaningful
const MIN_TEXT_LEN: usize = 3;

/// Finds a visible element whose text (or value, or placeholder) appears in
/// the failing expression, e.g. `button.clear-completed` finds the button
/// labelled "Clear completed".
#[derive(Debug, Default, Clone, Copy)]
pub struct TextStrategy;

fn words(text: &str) -> String {
    locator::humanize(text).to_lowercase()
}

#[async_trait]
impl Strategy for TextStrategy {
    fn name(&self) -> &str {
        "text"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        let literals: Vec<String> = locator::quoted_literals(probe.selector).iter().map(|l| words(l)).collect();
        let expression = words(probe.selector);
        let related = |text: &str| {
            let text = words(text);
            !text.is_empty() && (literals.contains(&text) || expression.contains(&text))
        };

        let mut tried = Vec::new();
        for element in probe.document.query_all(TEXT_CARRIERS).await? {
            if !element.visible {
                continue;
            }
            let selector = if let Some(text) = element.trimmed_text() {
                (text.chars().count() >= MIN_TEXT_LEN && related(text)).then(|| (locator::exact_text(text), text))
            } else if let Some(value) = element.non_empty_attribute("value") {
                (value.chars().count() >= MIN_TEXT_LEN && related(value)).then(|| (locator::attribute("value", value), value))
            } else if let Some(placeholder) = element.non_empty_attribute("placeholder") {
                (placeholder.chars().count() >= MIN_TEXT_LEN && related(placeholder))
                    .then(|| (locator::placeholder(placeholder), placeholder))
            } else {
                None
            };

            let Some((selector, text)) = selector else {
                continue;
            };
            if tried.contains(&selector) {
                continue;
            }
            if probe.document.is_unique(&selector).await {
                return Ok(Some(Candidate::new(selector, format!("Found element by visible text: \"{}\"", text))));
            }
            tried.push(selector);
        }
        Ok(None)
    }
}
