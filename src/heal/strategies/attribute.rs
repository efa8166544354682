use super::{Candidate, Probe, Strategy, prefer, push_unique, shares_keyword};
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

/// Attributes tried, most stable first
pub const STABLE_ATTRIBUTES: &[&str] = &["data-testid", "id", "name", "aria-label", "placeholder", "type", "class"];

/// Finds an element that alone carries a given attribute value. Within one
/// attribute, values sharing a keyword with the failing expression are
/// tried first.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeStrategy;

#[async_trait]
impl Strategy for AttributeStrategy {
    fn name(&self) -> &str {
        "attribute"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        let keywords = locator::keywords(&probe.combined_text());

        for attribute in STABLE_ATTRIBUTES {
            let elements = match probe.document.query_all(&format!("[{}]", attribute)).await {
                Ok(elements) => elements,
                Err(e) => {
                    log::debug!("Listing [{}] failed: {}", attribute, e);
                    continue;
                }
            };

            let mut values = Vec::new();
            for element in &elements {
                if let Some(value) = element.non_empty_attribute(attribute) {
                    push_unique(&mut values, value);
                }
            }

            for value in prefer(values, |v| shares_keyword(v, &keywords)) {
                let selector = locator::attribute(attribute, &value);
                if probe.document.is_unique(&selector).await {
                    return Ok(Some(Candidate::new(
                        selector,
                        format!("Found stable element using {}=\"{}\"", attribute, value),
                    )));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomSnapshot, ElementNode};

    #[tokio::test]
    async fn test_test_id_wins_over_id() {
        let doc = DomSnapshot::new(
            ElementNode::new("body")
                .child(ElementNode::new("button").attr("id", "save").with_text("Save"))
                .child(ElementNode::new("button").attr("data-testid", "cancel-button").with_text("Cancel")),
        );
        let candidate = AttributeStrategy.probe(&Probe::new(&doc, "#save-btn", None)).await.unwrap().unwrap();
        assert_eq!(candidate.selector, "[data-testid=\"cancel-button\"]");
        assert_eq!(candidate.reason, "Found stable element using data-testid=\"cancel-button\"");
    }

    #[tokio::test]
    async fn test_keyword_related_value_first() {
        let doc = DomSnapshot::new(
            ElementNode::new("body")
                .child(ElementNode::new("div").attr("id", "header"))
                .child(ElementNode::new("div").attr("id", "sidebar"))
                .child(ElementNode::new("div").attr("id", "checkout-summary")),
        );
        let candidate = AttributeStrategy.probe(&Probe::new(&doc, "#checkout-old", None)).await.unwrap().unwrap();
        assert_eq!(candidate.selector, "[id=\"checkout-summary\"]");
    }

    #[tokio::test]
    async fn test_shared_values_are_skipped() {
        let doc = DomSnapshot::new(
            ElementNode::new("ul")
                .child(ElementNode::new("li").attr("class", "row"))
                .child(ElementNode::new("li").attr("class", "row")),
        );
        assert_eq!(AttributeStrategy.probe(&Probe::new(&doc, ".row-old", None)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_class_attribute_last() {
        let doc = DomSnapshot::new(
            ElementNode::new("ul")
                .child(ElementNode::new("li").attr("class", "row"))
                .child(ElementNode::new("li").attr("class", "row selected")),
        );
        let candidate = AttributeStrategy.probe(&Probe::new(&doc, ".active-row", None)).await.unwrap().unwrap();
        assert_eq!(candidate.selector, "[class=\"row selected\"]");
    }
}
