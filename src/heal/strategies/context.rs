use super::{Candidate, Probe, Strategy};
use crate::document::Document;
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

const INPUT_WORDS: &[&str] = &["input", "type", "enter", "fill"];
const TOGGLE_WORDS: &[&str] = &["toggle", "check", "complete", "mark"];
const BUTTON_WORDS: &[&str] = &["button", "click", "submit"];
const LINK_WORDS: &[&str] = &["link", "filter", "navigate"];

/// Input types that are not text entry fields
const NON_TEXT_TYPES: &[&str] = &["hidden", "submit", "button", "checkbox", "radio"];

/// Uses the caller's description of the element to decide what kind of
/// element to look for (text field, checkbox, button, link), then looks for
/// a visible element of that kind that can be addressed uniquely.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextStrategy;

impl ContextStrategy {
    async fn text_field(document: &dyn Document, context: &str) -> Result<Option<Candidate>> {
        for field in document.query_all("input:visible, textarea:visible").await? {
            if field.attribute("type").is_some_and(|t| NON_TEXT_TYPES.contains(&t.to_ascii_lowercase().as_str())) {
                continue;
            }
            if let Some(placeholder) = field.non_empty_attribute("placeholder") {
                let selector = locator::placeholder(placeholder);
                if document.is_unique(&selector).await {
                    return Ok(Some(Candidate::new(
                        selector,
                        format!("Context \"{}\": found visible input with placeholder", context),
                    )));
                }
            }
            if let Some(name) = field.non_empty_attribute("name") {
                let selector = locator::attribute("name", name);
                if document.is_unique(&selector).await {
                    return Ok(Some(Candidate::new(
                        selector,
                        format!("Context \"{}\": found input by name attribute", context),
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn toggle(document: &dyn Document, context: &str) -> Result<Option<Candidate>> {
        let checkboxes = document.query_all("input[type=\"checkbox\"]:visible, .toggle:visible").await?;
        if checkboxes.is_empty() {
            return Ok(None);
        }
        for checkbox in &checkboxes {
            if let Some(class) = checkbox.first_class() {
                let selector = format!(".{}", class);
                if document.is_unique(&selector).await {
                    return Ok(Some(Candidate::new(
                        selector,
                        format!("Context \"{}\": found toggle/checkbox element", context),
                    )));
                }
            }
        }
        let selector = "input[type=\"checkbox\"]";
        if document.is_unique(selector).await {
            return Ok(Some(Candidate::new(selector, format!("Context \"{}\": found checkbox input", context))));
        }
        Ok(None)
    }

    async fn by_text(document: &dyn Document, tag: &str, kind: &str, context: &str) -> Result<Option<Candidate>> {
        for element in document.query_all(&locator::visible(tag)).await? {
            let Some(text) = element.trimmed_text() else {
                continue;
            };
            let selector = locator::has_text(tag, text);
            if document.is_unique(&selector).await {
                return Ok(Some(Candidate::new(
                    selector,
                    format!("Context \"{}\": found {} with text", context, kind),
                )));
            }
        }
        Ok(None)
    }
}

fn mentions(context: &str, words: &[&str]) -> bool {
    words.iter().any(|word| context.contains(word))
}

#[async_trait]
impl Strategy for ContextStrategy {
    fn name(&self) -> &str {
        "context"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        let Some(context) = probe.context.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let lower = context.to_lowercase();
        let document = probe.document;

        if mentions(&lower, INPUT_WORDS) {
            if let Some(candidate) = Self::text_field(document, context).await? {
                return Ok(Some(candidate));
            }
        }
        if mentions(&lower, TOGGLE_WORDS) {
            if let Some(candidate) = Self::toggle(document, context).await? {
                return Ok(Some(candidate));
            }
        }
        if mentions(&lower, BUTTON_WORDS) {
            if let Some(candidate) = Self::by_text(document, "button", "button", context).await? {
                return Ok(Some(candidate));
            }
        }
        if mentions(&lower, LINK_WORDS) {
            if let Some(candidate) = Self::by_text(document, "a", "link", context).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
