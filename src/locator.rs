//! Locator expressions and element handles
//!
//! A locator expression is an opaque string as far as the healing engine is
//! concerned. The helpers here build expressions in the dialect both drivers
//! understand:
//!
//! - CSS selector lists, extended with `:visible` and `:has-text("..")`
//! - `text="exact"` / `text=substring`
//! - `role=button[name="Save"]`
//! - XPath (`xpath=` prefix, or starting with `/` or `(`)
//! - a trailing `>> nth=N` to pick the N-th match in document order

use serde::{Deserialize, Serialize};

/// Quote a value for use inside an expression, escaping `"` and `\`
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `[name="value"]`
pub fn attribute(name: &str, value: &str) -> String {
    format!("[{}={}]", name, quote(value))
}

/// `[placeholder="value"]`
pub fn placeholder(value: &str) -> String {
    attribute("placeholder", value)
}

/// `role=role` or `role=role[name="name"]`
pub fn role(role: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("role={}[name={}]", role, quote(name)),
        None => format!("role={}", role),
    }
}

/// `text="value"`, exact match on normalised text
pub fn exact_text(value: &str) -> String {
    format!("text={}", quote(value))
}

/// `base:has-text("value")`
pub fn has_text(base: &str, value: &str) -> String {
    format!("{}:has-text({})", base, quote(value))
}

/// `selector:visible`
pub fn visible(selector: &str) -> String {
    format!("{}:visible", selector)
}

/// `selector:first-of-type`
pub fn first_of_type(selector: &str) -> String {
    format!("{}:first-of-type", selector)
}

/// `selector >> nth=index`
pub fn nth(selector: &str, index: usize) -> String {
    format!("{} >> nth={}", selector, index)
}

/// Whether the expression is written as XPath
pub fn is_xpath(selector: &str) -> bool {
    let trimmed = selector.trim_start();
    trimmed.starts_with("xpath=") || trimmed.starts_with('/') || trimmed.starts_with('(')
}

/// Split a trailing `>> nth=N` off an expression
pub fn split_nth(selector: &str) -> (&str, Option<usize>) {
    if let Some((head, tail)) = selector.rsplit_once(">>") {
        if let Some(index) = tail.trim().strip_prefix("nth=") {
            if let Ok(index) = index.trim().parse::<usize>() {
                return (head.trim_end(), Some(index));
            }
        }
    }
    (selector, None)
}

/// Quoted literals appearing in an expression, e.g. `Save` in `text="Save"`
pub fn quoted_literals(selector: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut chars = selector.chars();
    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        let mut literal = String::new();
        let mut closed = false;
        while let Some(next) = chars.next() {
            match next {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                }
                q if q == c => {
                    closed = true;
                    break;
                }
                other => literal.push(other),
            }
        }
        if closed && !literal.trim().is_empty() {
            literals.push(literal);
        }
    }
    literals
}

/// Lowercase words longer than three letters, used to relate page content to
/// the failing expression and the context hint
pub fn keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_lowercase())
        .filter(|word| word.len() > 3)
        .map(str::to_string)
        .collect()
}

/// Turn `.submit-button` or `#main_nav` into `submit button` / `main nav`
pub fn humanize(selector: &str) -> String {
    selector
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Handle to a live element: the expression that resolved it plus its
/// position among that expression's matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Expression that matched the element at resolution time
    pub selector: String,

    /// Position among the matches in document order
    #[serde(default)]
    pub nth: usize,
}

impl ElementHandle {
    /// Handle to the first match of `selector`
    pub fn first(selector: impl Into<String>) -> Self {
        Self { selector: selector.into(), nth: 0 }
    }

    /// Handle to the `nth` match of `selector`
    pub fn new(selector: impl Into<String>, nth: usize) -> Self {
        Self { selector: selector.into(), nth }
    }
}
