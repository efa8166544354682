use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a DOM element node of a captured document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "input")
    pub tag_name: String,

    /// Element attributes in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Text owned directly by the element (not by its children)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Whether the element itself is rendered (ancestors are checked separately)
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Tags that never carry a closing tag when rendered
const VOID_TAGS: [&str; 6] = ["input", "img", "br", "hr", "meta", "link"];

impl ElementNode {
    /// Create a new visible ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            text_content: None,
            children: Vec::new(),
            is_visible: true,
        }
    }

    /// Builder method: add an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: append a child
    pub fn child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: mark the element as not rendered
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(child);
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check if element has a specific class
    pub fn has_class(&self, class_name: &str) -> bool {
        self.get_attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    /// Get element ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    fn input_type(&self) -> String {
        self.get_attribute("type").unwrap_or("text").to_ascii_lowercase()
    }

    /// Whether the element is a checked checkbox or radio
    pub fn is_checked(&self) -> bool {
        self.attributes.contains_key("checked")
    }

    /// Text of this element and all descendants, whitespace-normalised.
    /// Button-like inputs contribute their `value`.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        normalize_whitespace(&parts.join(" "))
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        if self.is_tag("input") {
            if matches!(self.input_type().as_str(), "button" | "submit" | "reset") {
                if let Some(value) = self.get_attribute("value") {
                    parts.push(value);
                }
            }
            return;
        }
        if let Some(text) = &self.text_content {
            parts.push(text);
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    /// ARIA role: the explicit `role` attribute, or the implicit role of the tag
    pub fn role(&self) -> Option<String> {
        if let Some(role) = self.get_attribute("role") {
            return role.split_whitespace().next().map(str::to_string);
        }
        let implicit = match self.tag_name.as_str() {
            "button" => "button",
            "a" if self.attributes.contains_key("href") => "link",
            "textarea" => "textbox",
            "select" => "combobox",
            "li" => "listitem",
            "ul" | "ol" => "list",
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "input" => match self.input_type().as_str() {
                "checkbox" => "checkbox",
                "radio" => "radio",
                "button" | "submit" | "reset" => "button",
                "text" | "email" | "search" | "tel" | "url" => "textbox",
                _ => return None,
            },
            _ => return None,
        };
        Some(implicit.to_string())
    }

    /// Accessible name: `aria-label`, then content for content-named roles,
    /// then `placeholder`/`title` for form fields
    pub fn accessible_name(&self) -> String {
        if let Some(label) = self.get_attribute("aria-label").filter(|l| !l.trim().is_empty()) {
            return normalize_whitespace(label);
        }
        if self.is_tag("input") || self.is_tag("textarea") || self.is_tag("select") {
            let text = self.full_text();
            if !text.is_empty() {
                return text;
            }
            return self
                .get_attribute("placeholder")
                .or_else(|| self.get_attribute("title"))
                .map(normalize_whitespace)
                .unwrap_or_default();
        }
        let text = self.full_text();
        if text.is_empty() {
            self.get_attribute("title").map(normalize_whitespace).unwrap_or_default()
        } else {
            text
        }
    }

    /// Render the element and its subtree as HTML
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        self.write_html(&mut html);
        html
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag_name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
        if !self.is_visible {
            out.push_str(" hidden");
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag_name.as_str()) {
            return;
        }
        if let Some(text) = &self.text_content {
            out.push_str(&escape_html(text));
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag_name);
        out.push('>');
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
