//! Crawler module for link discovery and content harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fingerprinting, probing and downloads
//! - Link classification
//! - The two-wave frontier
//! - Direct downloads and page-anchor routing
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod download;
mod fetcher;
mod frontier;
mod links;

pub use classifier::{LinkClass, LinkClassifier};
pub use coordinator::{Coordinator, CrawlPhase, PageOutcome};
pub use download::{DownloadHandler, DownloadOutcome, DownloadRequest, DownloadTarget};
pub use fetcher::{
    build_http_client, download_to_file, fetch_fingerprint, probe, user_agent_string, FetchError,
};
pub use frontier::{Frontier, FrontierEntry};
pub use links::{LinkProcessor, LinkSummary};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::Result;

/// Crawls every seed in turn with one coordinator
///
/// Seeds given here take precedence; when `seeds` is empty the seeds from
/// the configuration are used. Each seed gets its own run record, and the
/// registries carry over from one seed to the next, so a page reachable from
/// two seeds is harvested once.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, stored with each run
/// * `seeds` - Seed URLs from the command line
/// * `fresh` - Whether to discard the saved checkpoint first
///
/// # Returns
///
/// * `Ok(reports)` - One report per seed, in order
/// * `Err(HarvestError)` - A fatal error stopped the crawl
pub async fn crawl(
    config: Config,
    config_hash: &str,
    seeds: &[String],
    fresh: bool,
) -> Result<Vec<CrawlReport>> {
    let seeds: Vec<String> = if seeds.is_empty() {
        config.crawler.seeds.clone()
    } else {
        seeds.to_vec()
    };

    let mut coordinator = Coordinator::new(config, fresh)?.with_config_hash(config_hash);
    let mut reports = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        reports.push(coordinator.run(seed).await?);
    }
    Ok(reports)
}
