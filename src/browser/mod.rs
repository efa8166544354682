//! Chrome driver
//!
//! [`BrowserSession`] launches or attaches to Chrome through headless_chrome;
//! [`PageDocument`] exposes one of its tabs as a [`crate::Document`].

pub mod config;
pub mod page;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use page::PageDocument;
pub use session::{BrowserSession, normalize_url};
