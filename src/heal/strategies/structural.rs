use super::{Candidate, Probe, Strategy, push_unique};
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// `[2]` in XPath, `:nth-child(2)` / `:nth-of-type(2)` in CSS
static INDEX_PREDICATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]|:nth-(?:child|of-type)\(\d+\)").expect("valid regex"));

/// `div` in tag position
static DIV_STEP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|[\s/>+~(,])div\b").expect("valid regex"));

/// Mechanical rewrites of the failing expression: drop the first index
/// predicate, loosen `div` steps to `*`, then take the first structural
/// match.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralStrategy;

impl StructuralStrategy {
    pub fn variants(selector: &str) -> Vec<String> {
        let mut variants = Vec::new();
        push_unique(&mut variants, &INDEX_PREDICATE.replace(selector, ""));
        push_unique(&mut variants, &DIV_STEP.replace_all(selector, "${1}*"));

        let (base, _) = locator::split_nth(selector);
        if locator::is_xpath(base) {
            let path = base.trim_start().strip_prefix("xpath=").unwrap_or(base);
            push_unique(&mut variants, &format!("({})[1]", path));
        } else {
            push_unique(&mut variants, &locator::nth(base, 0));
        }

        variants.retain(|v| v != selector && !v.trim().is_empty());
        variants
    }
}

#[async_trait]
impl Strategy for StructuralStrategy {
    fn name(&self) -> &str {
        "structural"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        let reason = if locator::is_xpath(probe.selector) {
            "Found using alternative XPath"
        } else {
            "Found using alternative CSS path"
        };
        for variant in Self::variants(probe.selector) {
            if probe.document.is_unique(&variant).await {
                return Ok(Some(Candidate::new(variant, reason)));
            }
        }
        Ok(None)
    }
}
