//! HTTP fetcher implementation
//!
//! This module handles the plain HTTP requests of the crawler:
//! - Building the shared client with the configured user agent
//! - Content fingerprinting (one GET per frontier candidate)
//! - HEAD probes used by the link classifier
//! - Streaming document downloads to disk

use crate::config::UserAgentConfig;
use crate::state::ContentFingerprint;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors from a single HTTP exchange
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout applied to every call
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns the SHA-256 fingerprint of its body
///
/// A non-success status or any network error yields `None`; callers then
/// have no content identity for the URL.
pub async fn fetch_fingerprint(client: &Client, url: &str) -> Option<ContentFingerprint> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Fingerprint fetch failed for {}: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "Fingerprint fetch for {} returned HTTP {}",
            url,
            response.status()
        );
        return None;
    }

    match response.text().await {
        Ok(body) => Some(ContentFingerprint::of_bytes(body.as_bytes())),
        Err(e) => {
            tracing::debug!("Failed to read body of {}: {}", url, e);
            None
        }
    }
}

/// Sends a HEAD request and reports whether the URL answers with success
///
/// Servers that reject HEAD with 405 are retried once with GET.
///
/// # Returns
///
/// * `Ok(status)` - The URL answered with a 2xx status
/// * `Err(FetchError)` - Non-success status or network failure
pub async fn probe(client: &Client, url: &str) -> Result<u16, FetchError> {
    let mut response = client
        .head(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        tracing::trace!("HEAD not allowed for {}, retrying with GET", url);
        response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
    }

    let status = response.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Streams a URL's body into `dest`
///
/// The body is written to a sibling `.part` file first and renamed into place
/// once complete, so an interrupted download never leaves a truncated file at
/// `dest`.
///
/// # Returns
///
/// * `Ok(bytes)` - Number of bytes written
/// * `Err(FetchError)` - Status, network or filesystem failure
pub async fn download_to_file(client: &Client, url: &str, dest: &Path) -> Result<u64, FetchError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let partial = std::path::PathBuf::from(partial);

    let mut file = tokio::fs::File::create(&partial).await?;
    let mut written = 0u64;

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(FetchError::from_reqwest(url, e));
            }
        };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;

    tracing::debug!("Downloaded {} bytes from {} to {}", written, url, dest.display());
    Ok(written)
}
