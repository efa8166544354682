//! Narrowing a locator that matches more than one element

use super::strategies::{Candidate, Win};
use crate::document::Document;
use crate::locator;

pub const FIRST_OF_TYPE: &str = "refine:first-of-type";
pub const VISIBLE: &str = "refine:visible";
pub const FIRST_MATCH: &str = "refine:first-match";

/// Narrow an ambiguous expression to a single element.
///
/// Tries the first element of its kind among siblings, then the visible
/// matches. When neither leaves exactly one element the first match in
/// document order is taken, so this never fails.
pub async fn refine(document: &dyn Document, selector: &str) -> Win {
    let attempts = [
        (FIRST_OF_TYPE, locator::first_of_type(selector), "Refined to first of its type among siblings"),
        (VISIBLE, locator::visible(selector), "Refined to the only visible match"),
    ];

    for (strategy, refined, reason) in attempts {
        if document.is_unique(&refined).await {
            return Win { strategy: strategy.to_string(), candidate: Candidate::new(refined, reason) };
        }
    }

    let (base, _) = locator::split_nth(selector);
    Win {
        strategy: FIRST_MATCH.to_string(),
        candidate: Candidate::new(
            locator::nth(base, 0),
            "Multiple matches, defaulting to first in document order",
        ),
    }
}
