use super::{Candidate, Probe, Strategy, push_unique};
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

/// Roles tried, in order, for each candidate accessible name
const ROLES: &[&str] = &["button", "link", "textbox", "heading", "listitem", "checkbox"];

/// Looks the element up by ARIA role and accessible name. Names come from
/// quoted literals in the failing expression, then the context, then the
/// expression's words. Falls back to the page's only textbox, if it has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleStrategy;

impl RoleStrategy {
    fn names(probe: &Probe<'_>) -> Vec<String> {
        let mut names = Vec::new();
        for literal in locator::quoted_literals(probe.selector) {
            push_unique(&mut names, literal.trim());
        }
        if let Some(context) = probe.context {
            push_unique(&mut names, context.trim());
        }
        let (selector, _) = locator::split_nth(probe.selector);
        push_unique(&mut names, &locator::humanize(selector));
        names
    }
}

#[async_trait]
impl Strategy for RoleStrategy {
    fn name(&self) -> &str {
        "role"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        for name in Self::names(probe) {
            for role in ROLES {
                let selector = locator::role(role, Some(&name));
                if probe.document.is_unique(&selector).await {
                    return Ok(Some(Candidate::new(selector, "Switched to role-based selector for better stability")));
                }
            }
        }

        let textbox = locator::role("textbox", None);
        if probe.document.is_unique(&textbox).await {
            return Ok(Some(Candidate::new(textbox, "Found single textbox using role selector")));
        }
        Ok(None)
    }
}
