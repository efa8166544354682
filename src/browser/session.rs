use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::page::PageDocument;
use crate::error::{HealError, Result};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,

    /// Default timeout applied to every tab handed out
    timeout: Duration,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Keep the browser alive for long test runs (default is 30 seconds)
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| HealError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| HealError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        log::debug!("Launched browser (headless: {})", options.headless);
        Ok(Self { browser, timeout: Duration::from_millis(options.timeout) })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect(options.ws_url).map_err(|e| HealError::ConnectionFailed(e.to_string()))?;

        Ok(Self { browser, timeout: Duration::from_millis(options.timeout) })
    }

    /// Launch a browser with default options
    pub fn new() -> Result<Self> {
        Self::launch(LaunchOptions::default())
    }

    /// Get the active tab
    pub fn tab(&self) -> Result<Arc<Tab>> {
        let tab = self.get_active_tab()?;
        tab.set_default_timeout(self.timeout);
        Ok(tab)
    }

    /// Create a new tab
    pub fn new_tab(&mut self) -> Result<Arc<Tab>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| HealError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(self.timeout);
        Ok(tab)
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| HealError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab by checking the document visibility and focus state
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        // First pass: visible and focused
        for tab in &tabs {
            match tab.evaluate("document.visibilityState === 'visible' && document.hasFocus()", false) {
                Ok(remote_object) => {
                    if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                        return Ok(tab.clone());
                    }
                }
                Err(e) => {
                    log::debug!("Failed to check tab status: {}", e);
                    continue;
                }
            }
        }

        // Second pass: visible only
        for tab in &tabs {
            if let Ok(remote_object) = tab.evaluate("document.visibilityState === 'visible'", false) {
                if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                    return Ok(tab.clone());
                }
            }
        }

        // A freshly launched headless browser may report no focused tab yet
        tabs.into_iter()
            .next()
            .ok_or_else(|| HealError::TabOperationFailed("No active tab found".to_string()))
    }

    /// Close the active tab
    pub fn close_active_tab(&mut self) -> Result<()> {
        self.tab()?.close(true).map_err(|e| HealError::TabOperationFailed(format!("Failed to close tab: {}", e)))?;

        Ok(())
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Navigate the active tab, completing partial URLs first
    pub fn navigate(&self, url: &str) -> Result<()> {
        let url = normalize_url(url);
        self.tab()?
            .navigate_to(&url)
            .map_err(|e| HealError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    /// Wait for navigation to complete
    pub fn wait_for_navigation(&self) -> Result<()> {
        self.tab()?
            .wait_until_navigated()
            .map_err(|e| HealError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// The active tab as a healable document
    pub fn document(&self) -> Result<PageDocument> {
        Ok(PageDocument::new(self.tab()?))
    }

    /// Close the browser
    pub fn close(&self) -> Result<()> {
        // headless_chrome closes the process when Browser is dropped; closing
        // every tab is the closest explicit shutdown
        let tabs = self.get_tabs()?;
        for tab in tabs {
            let _ = tab.close(false);
        }
        Ok(())
    }
}

/// Normalize an incomplete URL by adding missing protocol and handling common patterns
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
        || trimmed.starts_with("data:")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("chrome://")
        || trimmed.starts_with("chrome-extension://")
    {
        return trimmed.to_string();
    }

    // Relative path - return as-is
    if trimmed.starts_with('/') || trimmed.starts_with("./") || trimmed.starts_with("../") {
        return trimmed.to_string();
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    if trimmed.contains('.') {
        return format!("https://{}", trimmed);
    }

    // Single word: "google" -> "https://www.google.com"
    format!("https://www.{}.com", trimmed)
}
