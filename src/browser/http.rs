use crate::browser::{BrowserError, RenderResult, RenderTiming, RenderedPage};
use reqwest::Client;

/// Renders pages with a plain GET; scripts are not executed
pub struct HttpSession {
    client: Client,
    timing: RenderTiming,
}

impl HttpSession {
    pub fn new(client: Client, timing: RenderTiming) -> Self {
        Self { client, timing }
    }

    pub async fn render(&mut self, url: &str) -> RenderResult {
        let timeout_error = || BrowserError::Timeout {
            url: url.to_string(),
            secs: self.timing.timeout.as_secs(),
        };
        let navigation_error = |e: reqwest::Error| {
            if e.is_timeout() {
                timeout_error()
            } else {
                BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = tokio::time::timeout(self.timing.timeout, self.client.get(url).send())
            .await
            .map_err(|_| timeout_error())?
            .map_err(navigation_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|e| BrowserError::Content {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tokio::time::sleep(self.timing.settle).await;

        Ok(RenderedPage { final_url, html })
    }
}
