use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::{BrowserError, BrowserSession, LaunchOptions, NavigationError, RenderingEngine};

const CHROME_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--disable-features=VizDisplayCompositor",
];

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Headless Chromium driven over the DevTools protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumEngine;

#[async_trait]
impl RenderingEngine for ChromiumEngine {
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let (width, height) = options.viewport;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .request_timeout(options.request_timeout)
            .args(CHROME_ARGS.iter().copied());
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser event loop stopped");
                    break;
                }
            }
        });

        let session = match open_page(&browser, &options.user_agent).await {
            Ok(page) => ChromiumSession {
                browser,
                page,
                handler_task,
            },
            Err(err) => {
                let mut browser = browser;
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after launch error");
                }
                handler_task.abort();
                return Err(err);
            }
        };

        info!(width, height, "browser initialized");
        Ok(Box::new(session))
    }
}

async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page, BrowserError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|err| BrowserError::Launch(err.to_string()))?;
    page.set_user_agent(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .map_err(|err| BrowserError::Launch(err.to_string()))?;
    Ok(page)
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url, wait_until_idle: bool) -> Result<(), NavigationError> {
        let failed = |err: chromiumoxide::error::CdpError| NavigationError::Failed {
            url: url.to_string(),
            reason: err.to_string(),
        };

        self.page.goto(url.as_str()).await.map_err(failed)?;
        if wait_until_idle {
            // goto resolves on the load event; wait for any follow-up navigation too.
            self.page.wait_for_navigation().await.map_err(failed)?;
        }
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
        self.page
            .evaluate(SCROLL_TO_BOTTOM)
            .await
            .map(|_| ())
            .map_err(|err| NavigationError::Interaction(err.to_string()))
    }

    async fn content(&mut self) -> Result<String, NavigationError> {
        self.page
            .content()
            .await
            .map_err(|err| NavigationError::Interaction(err.to_string()))
    }

    async fn current_url(&mut self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Close(err.to_string()));
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        }
        self.handler_task.abort();
        info!("browser closed");
        closed
    }
}
