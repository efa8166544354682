//! Fallback strategies for a locator that matches nothing
//!
//! Each strategy looks at the live document and either proposes a
//! replacement expression that matches exactly one element or stays silent.
//! The chain tries them in a fixed order and stops at the first proposal.

pub mod attribute;
pub mod context;
pub mod heuristic;
pub mod placeholder;
pub mod role;
pub mod semantic;
pub mod structural;
pub mod text;

pub use attribute::AttributeStrategy;
pub use context::ContextStrategy;
pub use heuristic::HeuristicStrategy;
pub use placeholder::PlaceholderStrategy;
pub use role::RoleStrategy;
pub use semantic::SemanticStrategy;
pub use structural::StructuralStrategy;
pub use text::TextStrategy;

use crate::config::HealerConfig;
use crate::document::Document;
use crate::error::Result;
use crate::suggest::SuggestionProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inputs shared by every strategy for one healing attempt
#[derive(Clone, Copy)]
pub struct Probe<'a> {
    /// Document being healed against
    pub document: &'a dyn Document,

    /// The expression that failed
    pub selector: &'a str,

    /// Caller's description of the element, if any
    pub context: Option<&'a str>,
}

impl<'a> Probe<'a> {
    pub fn new(document: &'a dyn Document, selector: &'a str, context: Option<&'a str>) -> Self {
        Self { document, selector, context }
    }

    /// Failing expression and context joined, for keyword extraction
    pub fn combined_text(&self) -> String {
        match self.context {
            Some(context) => format!("{} {}", self.selector, context),
            None => self.selector.to_string(),
        }
    }
}

/// A proposed replacement expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub selector: String,
    pub reason: String,
}

impl Candidate {
    pub fn new(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { selector: selector.into(), reason: reason.into() }
    }
}

/// One self-contained way of finding a replacement expression
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name, recorded in the ledger
    fn name(&self) -> &str;

    /// Propose a replacement, or `Ok(None)` for no opinion. Errors are
    /// treated as no opinion by the chain.
    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>>;
}

/// First strategy proposal accepted by the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Win {
    pub strategy: String,
    pub candidate: Candidate,
}

/// Result of running the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Number of strategies invoked
    pub attempted: usize,
    pub win: Option<Win>,
}

/// Ordered, first-success-wins list of strategies
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The eight built-in strategies in priority order
    pub fn with_defaults(config: &HealerConfig, suggester: Arc<dyn SuggestionProvider>) -> Self {
        Self::new(vec![
            Box::new(PlaceholderStrategy),
            Box::new(ContextStrategy),
            Box::new(RoleStrategy),
            Box::new(TextStrategy),
            Box::new(AttributeStrategy),
            Box::new(HeuristicStrategy::new(config.heuristics.clone())),
            Box::new(StructuralStrategy),
            Box::new(SemanticStrategy::new(suggester, config.excerpt_limit, config.default_context.clone())),
        ])
    }

    /// Names of the strategies in order
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each strategy in turn. A proposal is accepted only if it matches
    /// exactly one element right now; later strategies are not invoked.
    pub async fn run(&self, probe: &Probe<'_>) -> ChainOutcome {
        let mut attempted = 0;
        for strategy in &self.strategies {
            attempted += 1;
            log::debug!("Trying strategy '{}' for '{}'", strategy.name(), probe.selector);

            let candidate = match strategy.probe(probe).await {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("Strategy '{}' failed: {}", strategy.name(), e);
                    continue;
                }
            };

            if !probe.document.is_unique(&candidate.selector).await {
                log::debug!(
                    "Strategy '{}' proposed '{}', which is not unique; ignoring",
                    strategy.name(),
                    candidate.selector
                );
                continue;
            }

            return ChainOutcome {
                attempted,
                win: Some(Win { strategy: strategy.name().to_string(), candidate }),
            };
        }
        ChainOutcome { attempted, win: None }
    }
}

/// Move items for which `preferred` holds to the front, keeping order otherwise
pub(crate) fn prefer<T>(items: Vec<T>, preferred: impl Fn(&T) -> bool) -> Vec<T> {
    let (mut front, back): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| preferred(item));
    front.extend(back);
    front
}

/// Whether `text` shares a keyword with `keywords`
pub(crate) fn shares_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

/// Push `value` unless an equal value is already present
pub(crate) fn push_unique(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HealError;
    use crate::suggest::DisabledSuggester;
    use std::sync::Mutex;

    struct Fixed {
        name: &'static str,
        answer: Option<&'static str>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Strategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn probe(&self, _probe: &Probe<'_>) -> Result<Option<Candidate>> {
            self.calls.lock().unwrap().push(self.name);
            match self.answer {
                Some("error") => Err(HealError::query("x", "boom")),
                Some(selector) => Ok(Some(Candidate::new(selector, self.name))),
                None => Ok(None),
            }
        }
    }

    fn chain(answers: &[(&'static str, Option<&'static str>)]) -> (StrategyChain, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let strategies = answers
            .iter()
            .map(|&(name, answer)| Box::new(Fixed { name, answer, calls: calls.clone() }) as Box<dyn Strategy>)
            .collect();
        (StrategyChain::new(strategies), calls)
    }

    #[test]
    fn test_default_order() {
        let chain = StrategyChain::with_defaults(&HealerConfig::default(), Arc::new(DisabledSuggester));
        assert_eq!(
            chain.names(),
            vec!["placeholder", "context", "role", "text", "attribute", "heuristic", "structural", "semantic"]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let doc = testing::todo_page();
        let (chain, calls) = chain(&[("a", None), ("b", Some("error")), ("c", Some("h1")), ("d", Some("footer"))]);

        let outcome = chain.run(&Probe::new(&doc, ".gone", None)).await;
        let win = outcome.win.unwrap();
        assert_eq!(win.strategy, "c");
        assert_eq!(win.candidate.selector, "h1");
        assert_eq!(outcome.attempted, 3);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_ambiguous_proposal_is_rejected() {
        let doc = testing::todo_page();
        let (chain, calls) = chain(&[("a", Some(".toggle")), ("b", Some("div["))]);

        let outcome = chain.run(&Probe::new(&doc, ".gone", None)).await;
        assert_eq!(outcome, ChainOutcome { attempted: 2, win: None });
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_prefer_keeps_relative_order() {
        let items = vec!["a1", "b1", "a2", "b2"];
        assert_eq!(prefer(items, |s| s.starts_with('b')), vec!["b1", "b2", "a1", "a2"]);
    }
}
