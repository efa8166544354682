//! Resolution orchestrator
//!
//! [`Healer::resolve`] is the single entry point. It counts the matches of
//! the caller's expression and then:
//! - exactly one: returns it untouched
//! - none (or the query itself failed): runs the [`StrategyChain`]
//! - several: narrows them with [`refine::refine`], which always succeeds
//!
//! Every substitution is appended to the [`HealingLedger`] before the result
//! is returned.

pub mod refine;
pub mod strategies;

pub use strategies::{Candidate, ChainOutcome, Probe, Strategy, StrategyChain, Win};

use crate::config::HealerConfig;
use crate::document::Document;
use crate::error::{HealError, Result};
use crate::ledger::{HealingEvent, HealingLedger, HealingStats};
use crate::locator::ElementHandle;
use crate::suggest::{SuggestionProvider, build_suggester};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Handle to the resolved element
    pub element: ElementHandle,

    /// Whether the caller's expression was replaced
    pub healed: bool,

    /// Replacement expression, set only when `healed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_selector: Option<String>,

    /// Why the replacement was chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Strategy or refinement step that produced the replacement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Set when the substitution could not be recorded in the ledger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_warning: Option<String>,
}

impl ResolutionResult {
    fn unhealed(selector: &str) -> Self {
        Self {
            element: ElementHandle::first(selector),
            healed: false,
            new_selector: None,
            reason: None,
            strategy: None,
            ledger_warning: None,
        }
    }

    /// Expression that currently finds the element
    pub fn selector(&self) -> &str {
        self.new_selector.as_deref().unwrap_or(self.element.selector.as_str())
    }
}

/// Self-healing element resolver
pub struct Healer {
    config: HealerConfig,
    chain: StrategyChain,
    ledger: HealingLedger,
}

impl Healer {
    /// Healer with the built-in strategies and the configured suggester
    pub fn new(config: HealerConfig) -> Result<Self> {
        let suggester = build_suggester(&config.suggester)?;
        Ok(Self::with_suggester(config, suggester))
    }

    /// Healer with the built-in strategies and a caller-supplied suggester
    pub fn with_suggester(config: HealerConfig, suggester: Arc<dyn SuggestionProvider>) -> Self {
        let chain = StrategyChain::with_defaults(&config, suggester);
        let ledger = HealingLedger::new(config.ledger_dir.clone());
        Self { config, chain, ledger }
    }

    /// Healer from explicit parts
    pub fn from_parts(config: HealerConfig, chain: StrategyChain, ledger: HealingLedger) -> Self {
        Self { config, chain, ledger }
    }

    pub fn config(&self) -> &HealerConfig {
        &self.config
    }

    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    pub fn ledger(&self) -> &HealingLedger {
        &self.ledger
    }

    /// Find the element `selector` was meant to identify, healing the
    /// expression if it no longer matches exactly one element
    pub async fn resolve(
        &self,
        document: &dyn Document,
        selector: &str,
        context: Option<&str>,
    ) -> Result<ResolutionResult> {
        let count = match document.count(selector).await {
            Ok(count) => count,
            Err(e) => {
                if e.is_query_failure() {
                    log::debug!("Query for '{}' failed, treating as not found: {}", selector, e);
                } else {
                    log::warn!("Query for '{}' failed, treating as not found: {}", selector, e);
                }
                0
            }
        };

        if count == 1 {
            return Ok(ResolutionResult::unhealed(selector));
        }

        if !self.config.enabled {
            log::debug!("Self-healing disabled; '{}' matched {} elements", selector, count);
            return Err(HealError::ElementUnresolvable { selector: selector.to_string(), attempted: 0 });
        }

        let win = if count == 0 {
            log::info!("Element not found with selector '{}', attempting self-healing", selector);
            let outcome = self.chain.run(&Probe::new(document, selector, context)).await;
            match outcome.win {
                Some(win) => win,
                None => {
                    return Err(HealError::ElementUnresolvable {
                        selector: selector.to_string(),
                        attempted: outcome.attempted,
                    });
                }
            }
        } else {
            log::info!("Multiple elements found ({}) for '{}', refining", count, selector);
            refine::refine(document, selector).await
        };

        let Win { strategy, candidate } = win;
        let event = HealingEvent::new(selector, &candidate.selector, &candidate.reason).with_strategy(&strategy);
        let ledger_warning = match self.ledger.append(&event).await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Healing of '{}' not recorded: {}", selector, e);
                Some(e.to_string())
            }
        };

        log::info!("Self-healing applied: '{}' -> '{}' ({})", selector, candidate.selector, candidate.reason);

        Ok(ResolutionResult {
            element: ElementHandle::first(candidate.selector.clone()),
            healed: true,
            new_selector: Some(candidate.selector),
            reason: Some(candidate.reason),
            strategy: Some(strategy),
            ledger_warning,
        })
    }

    /// Ledger statistics over the configured recent window
    pub async fn stats(&self) -> Result<HealingStats> {
        self.ledger.stats(self.config.recent_window).await
    }
}
