//! Rendering boundary: a launched browser session and the page fetcher built on it.
//!
//! Listing pages populate asynchronously, so a fetch only navigates. Callers ask
//! for scrolling and settle delays explicitly on the [`LoadedPage`] before taking
//! a [`RenderedPage`] snapshot.

mod chromium;

pub use chromium::ChromiumEngine;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{ScrapeConfig, DEFAULT_USER_AGENT};

/// Options applied when the browser is launched for a run.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub chrome_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            headless: true,
            user_agent: config.user_agent.clone(),
            viewport: (1920, 1080),
            chrome_path: config.chrome_path.clone(),
            request_timeout: config.navigation_timeout,
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: (1920, 1080),
            chrome_path: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-request navigation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub wait_until_idle: bool,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            wait_until_idle: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTML snapshot of a rendered page together with the URL it was rendered at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u128 },
    #[error("'{url}' is not a valid absolute URL: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("navigation to {url} failed: {reason}")]
    Failed { url: String, reason: String },
    #[error("page interaction failed: {0}")]
    Interaction(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("unable to launch browser: {0}")]
    Launch(String),
    #[error("unable to close browser: {0}")]
    Close(String),
    #[error("browser session was already released")]
    Released,
}

/// Starts browser sessions. One session is owned by one run.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions)
        -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A single browser tab driven sequentially by the orchestrator.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &Url, wait_until_idle: bool)
        -> Result<(), NavigationError>;
    async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError>;
    async fn content(&mut self) -> Result<String, NavigationError>;
    /// URL after redirects, when the engine can report it.
    async fn current_url(&mut self) -> Option<String>;
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Navigates a session with a hard timeout. No caching between calls.
pub struct PageFetcher<'s> {
    session: &'s mut dyn BrowserSession,
}

impl<'s> PageFetcher<'s> {
    pub fn new(session: &'s mut dyn BrowserSession) -> Self {
        Self { session }
    }

    pub async fn fetch(
        &mut self,
        url: &str,
        options: FetchOptions,
    ) -> Result<LoadedPage<'_>, NavigationError> {
        let target = Url::parse(url).map_err(|source| NavigationError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        debug!(%target, wait_until_idle = options.wait_until_idle, "navigating");
        tokio::time::timeout(
            options.timeout,
            self.session.navigate(&target, options.wait_until_idle),
        )
        .await
        .map_err(|_| NavigationError::Timeout {
            url: target.to_string(),
            timeout_ms: options.timeout.as_millis(),
        })??;

        Ok(LoadedPage {
            session: &mut *self.session,
            requested: target,
        })
    }
}

/// A page that has finished navigating and can be interacted with.
pub struct LoadedPage<'p> {
    session: &'p mut dyn BrowserSession,
    requested: Url,
}

impl LoadedPage<'_> {
    pub async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
        self.session.scroll_to_bottom().await
    }

    pub async fn wait(&mut self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn render(&mut self) -> Result<RenderedPage, NavigationError> {
        let html = self.session.content().await?;
        let url = self
            .session
            .current_url()
            .await
            .and_then(|raw| Url::parse(&raw).ok())
            .filter(|url| url.scheme() != "about")
            .unwrap_or_else(|| self.requested.clone());
        Ok(RenderedPage { url, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StallingSession;

    #[async_trait]
    impl BrowserSession for StallingSession {
        async fn navigate(&mut self, _url: &Url, _idle: bool) -> Result<(), NavigationError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
            Ok(())
        }

        async fn content(&mut self) -> Result<String, NavigationError> {
            Ok(String::new())
        }

        async fn current_url(&mut self) -> Option<String> {
            None
        }

        async fn close(self: Box<Self>) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    struct RedirectingSession;

    #[async_trait]
    impl BrowserSession for RedirectingSession {
        async fn navigate(&mut self, _url: &Url, _idle: bool) -> Result<(), NavigationError> {
            Ok(())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
            Ok(())
        }

        async fn content(&mut self) -> Result<String, NavigationError> {
            Ok("<html></html>".to_string())
        }

        async fn current_url(&mut self) -> Option<String> {
            Some("https://careers.example.com/search?page=1".to_string())
        }

        async fn close(self: Box<Self>) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_times_out_on_stalled_navigation() {
        let mut session = StallingSession;
        let mut fetcher = PageFetcher::new(&mut session);
        let options = FetchOptions {
            wait_until_idle: true,
            timeout: Duration::from_millis(500),
        };

        let error = fetcher
            .fetch("https://careers.example.com", options)
            .await
            .err()
            .expect("stalled navigation times out");
        assert!(matches!(error, NavigationError::Timeout { timeout_ms: 500, .. }));
    }

    #[tokio::test]
    async fn fetch_rejects_relative_urls() {
        let mut session = RedirectingSession;
        let mut fetcher = PageFetcher::new(&mut session);
        let error = fetcher
            .fetch("/jobs?q=react", FetchOptions::default())
            .await
            .err()
            .expect("relative url rejected");
        assert!(matches!(error, NavigationError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn render_prefers_the_post_redirect_url() {
        let mut session = RedirectingSession;
        let mut fetcher = PageFetcher::new(&mut session);
        let mut page = fetcher
            .fetch("https://careers.example.com/search", FetchOptions::default())
            .await
            .expect("navigation succeeds");
        let rendered = page.render().await.expect("render succeeds");
        assert_eq!(
            rendered.url.as_str(),
            "https://careers.example.com/search?page=1"
        );
        assert_eq!(rendered.html, "<html></html>");
    }
}
