use super::{Candidate, Probe, Strategy};
use crate::config::HeuristicRule;
use crate::error::Result;
use crate::locator;
use async_trait::async_trait;

/// Falls back to a fixed table of expressions known to work for the
/// application family under test. The first entry matching anything wins;
/// when it matches several elements it is narrowed to the first of them.
#[derive(Debug, Clone)]
pub struct HeuristicStrategy {
    rules: Vec<HeuristicRule>,
}

impl HeuristicStrategy {
    pub fn new(rules: Vec<HeuristicRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[HeuristicRule] {
        &self.rules
    }
}

#[async_trait]
impl Strategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn probe(&self, probe: &Probe<'_>) -> Result<Option<Candidate>> {
        for rule in &self.rules {
            let count = match probe.document.count(&rule.selector).await {
                Ok(count) => count,
                Err(e) => {
                    log::debug!("Heuristic '{}' failed: {}", rule.selector, e);
                    continue;
                }
            };
            match count {
                0 => continue,
                1 => return Ok(Some(Candidate::new(rule.selector.clone(), rule.reason.clone()))),
                n => {
                    return Ok(Some(Candidate::new(
                        locator::nth(&rule.selector, 0),
                        format!("{} (first of {} matches)", rule.reason, n),
                    )));
                }
            }
        }
        Ok(None)
    }
}
