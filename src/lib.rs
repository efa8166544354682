//! # adaptive-locator
//!
//! Self-healing element resolution for browser UI tests. When markup drifts
//! and a locator stops identifying exactly one element, the healer finds a
//! working replacement at run time and records every substitution in an
//! append-only ledger.
//!
//! ## Features
//!
//! - **Resolution**: one `resolve` call per element lookup; unique locators pass straight through
//! - **Strategy Chain**: eight fallback strategies tried in a fixed order (placeholder, context,
//!   role, text, attribute, domain heuristics, structural rewrites, semantic suggestion)
//! - **Refinement**: ambiguous locators are narrowed to a single element
//! - **Healing Ledger**: JSON Lines audit trail, safe under concurrent test workers
//! - **Drivers**: a Chrome driver (headless_chrome) and an in-memory DOM snapshot for tests
//!
//! ## Resolving against Chrome
//!
//! ```rust,no_run
//! use adaptive_locator::{BrowserSession, Document, Healer, HealerConfig, LaunchOptions};
//!
//! # async fn run() -> adaptive_locator::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.navigate("https://todomvc.com/examples/react/dist/")?;
//! session.wait_for_navigation()?;
//!
//! let healer = Healer::new(HealerConfig::default())?;
//! let page = session.document()?;
//!
//! let input = healer.resolve(&page, ".todo-input-broken", Some("Main todo input field")).await?;
//! if input.healed {
//!     println!("healed to {}", input.selector());
//! }
//! page.fill(&input.element, "Buy milk").await?;
//! page.press(&input.element, "Enter").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resolving against a snapshot
//!
//! ```rust
//! use adaptive_locator::{DomSnapshot, ElementNode, Healer, HealerConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> adaptive_locator::Result<()> {
//! # let dir = tempfile::tempdir().unwrap();
//! let page = DomSnapshot::new(
//!     ElementNode::new("body").child(ElementNode::new("input").attr("placeholder", "What needs to be done?")),
//! );
//! let healer = Healer::new(HealerConfig::default().ledger_dir(dir.path()))?;
//!
//! let result = healer.resolve(&page, ".todo-input-broken", None).await?;
//! assert_eq!(result.new_selector.as_deref(), Some("[placeholder=\"What needs to be done?\"]"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`heal`]: the [`Healer`], its strategy chain and the refinement step
//! - [`ledger`]: append-only record of substitutions and its statistics
//! - [`document`]: the [`Document`] capability the healer queries
//! - [`browser`]: Chrome session management and the [`PageDocument`] driver
//! - [`dom`]: in-memory element tree and the [`DomSnapshot`] driver
//! - [`locator`]: builders for the locator dialect
//! - [`suggest`]: semantic suggestion providers
//! - [`config`]: [`HealerConfig`]
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod config;
pub mod document;
pub mod dom;
pub mod error;
pub mod heal;
pub mod ledger;
pub mod locator;
pub mod suggest;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions, PageDocument};
pub use config::{HealerConfig, HeuristicRule};
pub use document::{Document, ElementInfo};
pub use dom::{DomSnapshot, ElementNode};
pub use error::{HealError, Result};
pub use heal::{Candidate, Healer, Probe, ResolutionResult, Strategy, StrategyChain};
pub use ledger::{HealingEvent, HealingLedger, HealingStats};
pub use locator::ElementHandle;
pub use suggest::{SuggesterConfig, SuggestionProvider};
