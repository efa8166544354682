//! Error types and result alias

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HealError>;

/// Errors produced by the drivers, the healing engine and the ledger
#[derive(Debug, Error)]
pub enum HealError {
    /// Browser process could not be launched
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Could not attach to a running browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Tab lookup, creation or close failed
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// Navigation failed or timed out
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// JavaScript evaluation in the page failed
    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The document could not answer a query for this expression
    #[error("Query for '{selector}' failed: {reason}")]
    QueryFailed { selector: String, reason: String },

    /// The expression is not understood by the driver
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// An element handle no longer points at a live element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Click, fill or key press could not be performed
    #[error("{action} failed: {reason}")]
    InteractionFailed { action: String, reason: String },

    /// A captured DOM could not be parsed or serialised
    #[error("DOM parse failed: {0}")]
    DomParseFailed(String),

    /// No strategy produced a unique match
    #[error("Element unresolvable: '{selector}' (tried {attempted} strategies)")]
    ElementUnresolvable { selector: String, attempted: usize },

    /// The semantic suggestion collaborator failed or is switched off
    #[error("Suggestion collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// A ledger record was torn or interleaved by an unsynchronized writer
    #[error("Ledger record at {}:{line} is torn or interleaved", path.display())]
    LedgerWriteConflict { path: PathBuf, line: usize },

    /// Ledger storage could not be read or written
    #[error("Ledger I/O on {}: {source}", path.display())]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HealError {
    /// Shorthand for a driver query failure
    pub fn query(selector: &str, reason: impl Into<String>) -> Self {
        HealError::QueryFailed { selector: selector.to_string(), reason: reason.into() }
    }

    pub(crate) fn ledger_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HealError::LedgerIo { path: path.into(), source }
    }

    /// Whether the error means "the expression did not work" rather than a
    /// broken environment
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            HealError::QueryFailed { .. } | HealError::InvalidSelector(_) | HealError::EvaluationFailed(_)
        )
    }
}
