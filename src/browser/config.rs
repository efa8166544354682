use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for launching a new browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,

    /// Window width in pixels
    pub window_width: u32,

    /// Window height in pixels
    pub window_height: u32,

    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,

    /// Profile directory; a temporary one when unset
    pub user_data_dir: Option<PathBuf>,

    /// Enable the Chrome sandbox
    pub sandbox: bool,

    /// Default timeout for every tab operation, in milliseconds
    pub timeout: u64,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 800,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
            timeout: 30_000,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builder method: set window size
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Builder method: set the browser binary
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    /// Builder method: set the profile directory
    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Builder method: enable or disable the sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Builder method: set the per-operation timeout in milliseconds
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = timeout_ms;
        self
    }
}

/// Options for attaching to a running browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// DevTools WebSocket URL
    pub ws_url: String,

    /// Default timeout for every tab operation, in milliseconds
    pub timeout: u64,
}

impl ConnectionOptions {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self { ws_url: ws_url.into(), timeout: 30_000 }
    }

    /// Builder method: set the per-operation timeout in milliseconds
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = timeout_ms;
        self
    }
}
