//! Page rendering
//!
//! One browser session is opened per crawl run and shared by every page of
//! that run. Two backends exist: a headless Chromium driven through the
//! DevTools protocol, and a plain HTTP renderer for sites that need no
//! script execution (and for tests).

mod chromium;
mod http;

pub use chromium::ChromiumSession;
pub use http::HttpSession;

use crate::config::{BrowserConfig, BrowserMode};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser session
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Page {url} did not load within {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read content of {url}: {reason}")]
    Content { url: String, reason: String },
}

/// HTML of a page after rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    pub html: String,
}

pub type RenderResult = Result<RenderedPage, BrowserError>;

/// Timing shared by both backends
#[derive(Debug, Clone, Copy)]
pub struct RenderTiming {
    /// Navigation timeout
    pub timeout: Duration,
    /// Wait after navigation before the content is read
    pub settle: Duration,
}

/// The rendering session of one crawl run
pub enum BrowserSession {
    Chromium(ChromiumSession),
    Http(HttpSession),
}

impl BrowserSession {
    /// Opens a session of the configured kind
    ///
    /// # Errors
    ///
    /// Returns `BrowserError::Launch` if Chromium cannot be started. The HTTP
    /// backend never fails to open.
    pub async fn launch(
        config: &BrowserConfig,
        client: &Client,
        user_agent: &str,
        timing: RenderTiming,
    ) -> Result<Self, BrowserError> {
        match config.mode {
            BrowserMode::Chromium => {
                let session = ChromiumSession::launch(config, user_agent, timing).await?;
                Ok(Self::Chromium(session))
            }
            BrowserMode::Http => Ok(Self::Http(HttpSession::new(client.clone(), timing))),
        }
    }

    /// Loads `url`, waits for the settle delay and returns the page HTML
    pub async fn render(&mut self, url: &str) -> RenderResult {
        match self {
            Self::Chromium(session) => session.render(url).await,
            Self::Http(session) => session.render(url).await,
        }
    }

    /// Releases the session
    pub async fn shutdown(self) {
        match self {
            Self::Chromium(session) => session.shutdown().await,
            Self::Http(_) => {}
        }
        tracing::debug!("Browser session released");
    }
}
