use crate::browser::{BrowserError, RenderResult, RenderTiming, RenderedPage};
use crate::config::BrowserConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;

/// Headless Chromium session
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    timing: RenderTiming,
}

impl ChromiumSession {
    pub async fn launch(
        config: &BrowserConfig,
        user_agent: &str,
        timing: RenderTiming,
    ) -> Result<Self, BrowserError> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .request_timeout(timing.timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", user_agent));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }

        let chrome_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its events are polled
        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        tracing::info!("Chromium session launched");

        Ok(Self {
            browser,
            handler,
            timing,
        })
    }

    pub async fn render(&mut self, url: &str) -> RenderResult {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let navigation = tokio::time::timeout(self.timing.timeout, page.goto(url)).await;

        let result = match navigation {
            Ok(Ok(_)) => {
                tokio::time::sleep(self.timing.settle).await;
                read_page(&page, url).await
            }
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                url: url.to_string(),
                secs: self.timing.timeout.as_secs(),
            }),
        };

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        result
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Chromium did not close cleanly: {}", e);
        }
        self.handler.abort();
        tracing::info!("Chromium session shut down");
    }
}

async fn read_page(page: &chromiumoxide::Page, url: &str) -> RenderResult {
    let content_error = |e: chromiumoxide::error::CdpError| BrowserError::Content {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let final_url = page
        .url()
        .await
        .map_err(content_error)?
        .unwrap_or_else(|| url.to_string());

    let html = page.content().await.map_err(content_error)?;

    Ok(RenderedPage { final_url, html })
}
