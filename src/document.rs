//! Document capability consumed by the healing engine
//!
//! The engine never talks to a browser directly. Anything that can count and
//! describe the elements matched by a locator expression can be healed
//! against: the Chrome driver ([`crate::browser::PageDocument`]) and the
//! in-memory snapshot ([`crate::dom::DomSnapshot`]) both implement
//! [`Document`].

use crate::error::{HealError, Result};
use crate::locator::ElementHandle;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Read-only description of one matched element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name
    pub tag_name: String,

    /// Attributes in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Whitespace-normalised text content
    #[serde(default)]
    pub text: String,

    /// Whether the element is rendered and visible
    #[serde(default)]
    pub visible: bool,
}

impl ElementInfo {
    /// Attribute value, if present
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, if present and non-empty
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|value| !value.trim().is_empty())
    }

    /// First class name
    pub fn first_class(&self) -> Option<&str> {
        self.attribute("class").and_then(|classes| classes.split_whitespace().next())
    }

    /// Trimmed text, if any
    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Query and interaction capability over a live (or captured) document
#[async_trait]
pub trait Document: Send + Sync {
    /// Number of elements currently matching `selector`
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Every element currently matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>>;

    /// Serialised markup of the whole document
    async fn content(&self) -> Result<String>;

    /// Click the element
    async fn click(&self, handle: &ElementHandle) -> Result<()>;

    /// Replace the element's value with `text`
    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<()>;

    /// Press a key while the element has focus
    async fn press(&self, handle: &ElementHandle, key: &str) -> Result<()>;

    /// Read the element a handle points at
    async fn inspect(&self, handle: &ElementHandle) -> Result<ElementInfo> {
        let mut matches = self.query_all(&handle.selector).await?;
        if handle.nth >= matches.len() {
            return Err(HealError::ElementNotFound(format!(
                "'{}' has {} matches, wanted index {}",
                handle.selector,
                matches.len(),
                handle.nth
            )));
        }
        Ok(matches.swap_remove(handle.nth))
    }

    /// Whether `selector` currently matches exactly one element; query
    /// failures count as "no"
    async fn is_unique(&self, selector: &str) -> bool {
        match self.count(selector).await {
            Ok(count) => count == 1,
            Err(e) => {
                log::debug!("Probe '{}' failed: {}", selector, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_info_accessors() {
        let mut info = ElementInfo { tag_name: "input".to_string(), ..Default::default() };
        info.attributes.insert("class".to_string(), "new-todo  primary".to_string());
        info.attributes.insert("placeholder".to_string(), "   ".to_string());

        assert_eq!(info.first_class(), Some("new-todo"));
        assert_eq!(info.attribute("placeholder"), Some("   "));
        assert_eq!(info.non_empty_attribute("placeholder"), None);
        assert_eq!(info.trimmed_text(), None);
    }
}
