//! Crawl reports and checkpoint statistics
//!
//! A [`CrawlReport`] is produced by every run and stored with its run record.
//! [`CrawlStatistics`] summarizes a whole checkpoint for the `--stats` view.

use crate::state::UrlClass;
use crate::storage::{Checkpoint, RunRecord, StorageResult};
use std::collections::BTreeMap;

/// Counts of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Seed URL the run was started with
    pub seed: String,

    /// Pages rendered and stored in the extracted data store
    pub pages_extracted: u64,

    /// Documents and cloud files written to the download folder
    pub documents_downloaded: u64,

    /// Document links whose file was already registered
    pub documents_skipped: u64,

    pub out_of_scope: u64,
    pub unfetchable: u64,
    pub errored: u64,

    /// Candidates dropped because their key or content was already seen
    pub duplicates_skipped: u64,

    pub media_ignored: u64,
    pub waves: u64,

    /// Frontier entries taken off the queue
    pub entries_processed: u64,

    /// The seed itself was already known; nothing was crawled
    pub seed_was_duplicate: bool,
}

impl CrawlReport {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..Self::default()
        }
    }
}

/// Summary of everything held in a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// URLs in the seen registry
    pub seen_urls: u64,

    /// Seen URLs that carry a content fingerprint
    pub fingerprinted: u64,

    pub pages: u64,
    pub documents: u64,

    /// Downloaded files per format tag
    pub downloads_by_format: BTreeMap<String, u64>,

    pub cloud_hosted: u64,

    /// Size of each classification set
    pub classified: BTreeMap<String, u64>,

    /// Frontier entries left by an interrupted run
    pub pending: u64,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from a checkpoint
///
/// # Arguments
///
/// * `storage` - The checkpoint backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to read the checkpoint
pub fn load_statistics(storage: &dyn Checkpoint) -> StorageResult<CrawlStatistics> {
    let state = storage.load_state()?;
    let pending = storage.load_pending()?;

    let classified = UrlClass::ALL
        .iter()
        .map(|class| (class.to_string(), state.classified.len(*class) as u64))
        .collect();

    let downloads_by_format = state
        .downloadables
        .counts()
        .into_iter()
        .map(|(format, count)| (format, count as u64))
        .collect();

    Ok(CrawlStatistics {
        seen_urls: state.seen.len() as u64,
        fingerprinted: state.seen.fingerprinted() as u64,
        pages: state.extracted.page_count() as u64,
        documents: state.extracted.document_count() as u64,
        downloads_by_format,
        cloud_hosted: state.cloud_hosted.len() as u64,
        classified,
        pending: pending.len() as u64,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs seen: {}", stats.seen_urls);
    println!("  With content fingerprint: {}", stats.fingerprinted);
    println!("  Pages extracted: {}", stats.pages);
    println!("  Documents recorded: {}", stats.documents);
    println!("  Cloud-hosted files: {}", stats.cloud_hosted);
    println!("  Pending frontier entries: {}", stats.pending);
    println!();

    if !stats.downloads_by_format.is_empty() {
        println!("Downloads by Format:");
        for (format, count) in &stats.downloads_by_format {
            println!("  {}: {}", format, count);
        }
        println!();
    }

    println!("Classified URLs:");
    for (class, count) in &stats.classified {
        println!("  {}: {}", class, count);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Seed: {}", run.seed);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Waves: {}", run.report.waves);
            println!("  Entries processed: {}", run.report.entries_processed);
        }
        None => println!("No crawl runs recorded yet."),
    }
}

/// Prints the report of a finished run
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report: {} ===\n", report.seed);

    if report.seed_was_duplicate {
        println!("Seed was already crawled; nothing to do.");
        return;
    }

    println!("  Waves: {}", report.waves);
    println!("  Entries processed: {}", report.entries_processed);
    println!("  Pages extracted: {}", report.pages_extracted);
    println!("  Documents downloaded: {}", report.documents_downloaded);
    println!("  Documents already present: {}", report.documents_skipped);
    println!("  Duplicates skipped: {}", report.duplicates_skipped);
    println!("  Out of scope: {}", report.out_of_scope);
    println!("  Unfetchable: {}", report.unfetchable);
    println!("  Errored: {}", report.errored);
    println!("  Media ignored: {}", report.media_ignored);
}
