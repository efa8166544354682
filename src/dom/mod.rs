//! In-memory DOM model
//!
//! This module provides a captured document that answers locator queries
//! without a browser. It includes:
//! - ElementNode: Representation of DOM elements (tag, ordered attributes, text, visibility)
//! - query: Parser for the locator dialect (CSS subset, XPath subset, text=, role=, nth)
//! - DomSnapshot: A [`crate::Document`] implementation over an ElementNode tree

pub mod element;
pub mod query;
pub mod snapshot;

pub use element::ElementNode;
pub use snapshot::DomSnapshot;
