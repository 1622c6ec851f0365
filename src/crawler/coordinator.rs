//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the wave loop that coordinates all aspects of the
//! crawling process, including:
//! - Loading registries and pending frontier entries from the checkpoint
//! - Submitting the seed and draining the frontier wave by wave
//! - Dispatching every entry by its link class
//! - Periodic and final checkpoints
//! - Run records and reporting

use crate::browser::{BrowserSession, RenderTiming};
use crate::config::{validate_seed_url, Config};
use crate::crawler::classifier::{LinkClass, LinkClassifier};
use crate::crawler::download::{DownloadHandler, DownloadOutcome, DownloadRequest, DownloadTarget};
use crate::crawler::fetcher::{build_http_client, fetch_fingerprint, user_agent_string};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::links::{LinkProcessor, LinkSummary};
use crate::extract::{
    annotate_images, collect_anchors, collect_images, collect_videos, enrich_videos,
    extract_page_content, page_tables_dir, ImageAnnotator, NoAnnotation, YouTubeClient,
};
use crate::output::CrawlReport;
use crate::state::{ContentRecord, CrawlState, PageRecord, UrlClass};
use crate::storage::{Checkpoint, RunStatus, SqliteStorage};
use crate::url::normalize_url;
use crate::{HarvestError, Result};
use chrono::Utc;
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use url::Url;

/// Phase of the crawl driver
///
/// `Idle -> WaveActive -> (WaveActive | Drained) -> Checkpointed -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    WaveActive { wave: u64 },
    Drained,
    Checkpointed,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::WaveActive { wave } => write!(f, "wave {} active", wave),
            Self::Drained => write!(f, "drained"),
            Self::Checkpointed => write!(f, "checkpointed"),
        }
    }
}

/// Result of processing a fetchable page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page rendered, content stored, anchors routed
    Extracted(LinkSummary),

    /// A record for this key already exists
    AlreadyExtracted,

    /// Rendering or parsing failed; the URL is recorded as Errored
    Failed { reason: String },
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    storage: SqliteStorage,
    client: Client,
    classifier: LinkClassifier,
    downloader: DownloadHandler,
    annotator: Box<dyn ImageAnnotator>,
    youtube: YouTubeClient,
    state: CrawlState,
    frontier: Frontier,
    /// Keys whose fingerprint fetch failed during the current run
    failed_candidates: HashSet<String>,
    phase: CrawlPhase,
    session: Option<BrowserSession>,
    report: CrawlReport,
    since_checkpoint: u32,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured checkpoint database
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to discard the saved registries and pending entries
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to open the checkpoint or build the client
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.storage.checkpoint_path))?;
        Self::with_storage(config, storage, fresh)
    }

    /// Creates a coordinator over an already opened checkpoint store
    pub fn with_storage(config: Config, mut storage: SqliteStorage, fresh: bool) -> Result<Self> {
        let interrupted = storage.mark_interrupted_runs()?;
        if interrupted > 0 {
            tracing::warn!("Marked {} unfinished run(s) as interrupted", interrupted);
        }

        if fresh {
            tracing::info!("Fresh crawl requested, clearing saved state");
            storage.clear_state()?;
        }

        let state = storage.load_state()?;
        let pending = storage.load_pending()?;

        if !state.is_empty() {
            tracing::info!(
                "Loaded checkpoint: {} seen URLs, {} extracted records, {} downloads",
                state.seen.len(),
                state.extracted.len(),
                state.downloadables.total()
            );
        }

        let mut frontier = Frontier::new();
        for entry in pending {
            frontier.push_next(entry);
        }

        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let classifier = LinkClassifier::from_config(&config);
        let downloader = DownloadHandler::new(client.clone(), &config.storage.download_folder);
        let youtube = YouTubeClient::new(client.clone(), config.video.api_key());

        Ok(Self {
            config,
            config_hash: String::new(),
            storage,
            client,
            classifier,
            downloader,
            annotator: Box::new(NoAnnotation),
            youtube,
            state,
            frontier,
            failed_candidates: HashSet::new(),
            phase: CrawlPhase::Idle,
            session: None,
            report: CrawlReport::default(),
            since_checkpoint: 0,
        })
    }

    /// Replaces the image annotator (OCR/captioning backend)
    pub fn with_annotator(mut self, annotator: Box<dyn ImageAnnotator>) -> Self {
        self.annotator = annotator;
        self
    }

    /// Replaces the YouTube metadata client
    pub fn with_youtube(mut self, youtube: YouTubeClient) -> Self {
        self.youtube = youtube;
        self
    }

    /// Sets the configuration hash recorded with each run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Number of frontier entries left over from an interrupted run
    pub fn pending_len(&self) -> usize {
        self.frontier.pending().len()
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs one crawl from `seed` until the frontier drains
    ///
    /// If the checkpoint holds entries left by an interrupted run, those are
    /// resumed instead and the seed is only recorded with the run.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are returned: an invalid seed, a browser that
    /// cannot be launched, or a checkpoint that cannot be written. Per-URL
    /// failures end up in the Errored set.
    pub async fn run(&mut self, seed: &str) -> Result<CrawlReport> {
        validate_seed_url(seed).map_err(|e| HarvestError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;

        self.report = CrawlReport::new(seed);
        self.since_checkpoint = 0;
        self.failed_candidates.clear();
        let run_id = self.storage.create_run(seed, &self.config_hash)?;
        tracing::info!("Starting crawl run {} from {}", run_id, seed);

        let result = self.crawl(seed).await;

        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }

        match result {
            Ok(()) => {
                self.storage
                    .finish_run(run_id, RunStatus::Completed, &self.report)?;
                self.transition(CrawlPhase::Idle);
                tracing::info!(
                    "Crawl run {} completed: {} pages, {} documents, {} errored in {} waves",
                    run_id,
                    self.report.pages_extracted,
                    self.report.documents_downloaded,
                    self.report.errored,
                    self.report.waves
                );
                Ok(self.report.clone())
            }
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", run_id, e);
                if let Err(finish_err) =
                    self.storage
                        .finish_run(run_id, RunStatus::Failed, &self.report)
                {
                    tracing::error!("Failed to record run {} as failed: {}", run_id, finish_err);
                }
                self.transition(CrawlPhase::Idle);
                Err(e)
            }
        }
    }

    async fn crawl(&mut self, seed: &str) -> Result<()> {
        if self.frontier.is_drained() {
            self.submit_seed(seed).await;
        } else {
            tracing::info!(
                "Resuming {} pending frontier entries from the checkpoint",
                self.frontier.next_len()
            );
        }

        if !self.frontier.is_drained() {
            self.session = Some(self.launch_session().await?);
        }

        let mut wave = 0u64;
        loop {
            let size = self.frontier.begin_wave();
            if size == 0 {
                break;
            }

            wave += 1;
            self.report.waves = wave;
            self.transition(CrawlPhase::WaveActive { wave });
            tracing::info!("Wave {}: {} entries", wave, size);

            while let Some(entry) = self.frontier.pop() {
                self.dispatch(entry).await;
                self.report.entries_processed += 1;
                self.since_checkpoint += 1;

                if self.since_checkpoint >= self.config.crawler.checkpoint_interval {
                    self.checkpoint()?;
                }
            }
        }

        self.transition(CrawlPhase::Drained);
        self.checkpoint()?;
        self.transition(CrawlPhase::Checkpointed);
        Ok(())
    }

    /// Normalizes, fingerprints and deduplicates the seed
    ///
    /// A seed that cannot be fingerprinted is still crawled, deduplicated by
    /// its key alone.
    async fn submit_seed(&mut self, seed: &str) {
        let key = normalize_url(seed, None);
        let fingerprint = fetch_fingerprint(&self.client, seed).await;

        if fingerprint.is_none() {
            tracing::warn!("Could not fingerprint seed {}, deduplicating by URL only", seed);
        }

        if self.state.seen.is_duplicate(&key, fingerprint.as_ref()) {
            tracing::info!("Seed {} was already crawled, nothing to do", seed);
            self.report.seed_was_duplicate = true;
            return;
        }

        self.state.seen.record(key.clone(), fingerprint);
        self.frontier
            .push_next(FrontierEntry::seed(key, seed.to_string()));
    }

    async fn launch_session(&self) -> Result<BrowserSession> {
        let timing = RenderTiming {
            timeout: self.config.crawler.request_timeout(),
            settle: self.config.crawler.settle_delay(),
        };
        let user_agent = user_agent_string(&self.config.user_agent);
        let session =
            BrowserSession::launch(&self.config.browser, &self.client, &user_agent, timing).await?;
        Ok(session)
    }

    /// Routes one frontier entry by its link class
    async fn dispatch(&mut self, entry: FrontierEntry) {
        let class = self.classifier.classify(&self.client, &entry.url).await;
        tracing::debug!("{} classified as {:?}", entry.url, class);

        match class {
            LinkClass::OutOfScope => {
                self.state.classified.insert(UrlClass::NonScope, entry.url);
                self.report.out_of_scope += 1;
            }
            LinkClass::MediaAsset => {
                tracing::debug!("Ignoring media asset {}", entry.url);
                self.report.media_ignored += 1;
            }
            LinkClass::Downloadable { format } => {
                self.download(entry, DownloadTarget::Document { format })
                    .await;
            }
            LinkClass::CloudHosted { file_id } => {
                self.download(entry, DownloadTarget::CloudDrive { file_id })
                    .await;
            }
            LinkClass::FetchablePage => match self.process_page(&entry).await {
                PageOutcome::Extracted(summary) => {
                    self.report.pages_extracted += 1;
                    self.absorb(&summary);
                }
                PageOutcome::AlreadyExtracted => {
                    tracing::debug!("{} already extracted", entry.url);
                    self.report.duplicates_skipped += 1;
                }
                PageOutcome::Failed { reason } => {
                    tracing::warn!("Failed to process {}: {}", entry.url, reason);
                    self.state.classified.insert(UrlClass::Errored, entry.url);
                    self.report.errored += 1;
                }
            },
            LinkClass::Unfetchable => {
                self.state.classified.insert(UrlClass::Unfetchable, entry.url);
                self.report.unfetchable += 1;
            }
        }
    }

    async fn download(&mut self, entry: FrontierEntry, target: DownloadTarget) {
        let request = DownloadRequest {
            url: entry.url,
            target,
            description: String::new(),
            source_page: entry.referrer,
        };

        match self.downloader.download(&mut self.state, request).await {
            DownloadOutcome::Downloaded(_) => self.report.documents_downloaded += 1,
            DownloadOutcome::AlreadyPresent { .. } => self.report.documents_skipped += 1,
            DownloadOutcome::Failed(_) => self.report.errored += 1,
        }
    }

    /// Renders a page, runs every extractor and routes its anchors
    async fn process_page(&mut self, entry: &FrontierEntry) -> PageOutcome {
        if self.state.extracted.contains(&entry.key) {
            return PageOutcome::AlreadyExtracted;
        }

        let Some(session) = self.session.as_mut() else {
            return PageOutcome::Failed {
                reason: "no browser session".to_string(),
            };
        };

        let rendered = match session.render(&entry.url).await {
            Ok(rendered) => rendered,
            Err(e) => {
                return PageOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let base = match Url::parse(&rendered.final_url).or_else(|_| Url::parse(&entry.url)) {
            Ok(base) => base,
            Err(e) => {
                return PageOutcome::Failed {
                    reason: format!("invalid page URL: {}", e),
                }
            }
        };

        let tables_dir = page_tables_dir(Path::new(&self.config.storage.tables_folder), &entry.key);

        // Html is not Send; keep it out of scope across awaits
        let (content, mut images, mut videos, anchors) = {
            let document = Html::parse_document(&rendered.html);
            (
                extract_page_content(&document, &entry.url, &tables_dir),
                collect_images(&document, &base, &self.config.formats.images),
                collect_videos(&document, &base, &entry.url, &self.config.formats.videos),
                collect_anchors(&document, &base),
            )
        };

        annotate_images(self.annotator.as_ref(), &mut images).await;
        enrich_videos(&self.youtube, &mut videos).await;

        let processor = LinkProcessor::new(&self.classifier, &self.client);
        let summary = processor
            .process(
                &anchors,
                &entry.url,
                &mut self.state,
                &mut self.downloader,
                &mut self.frontier,
                &mut self.failed_candidates,
            )
            .await;

        let record = PageRecord {
            url: entry.url.clone(),
            text: content.text,
            tables: content.tables,
            images,
            videos,
            documents: summary.documents.clone(),
            extracted_at: Utc::now(),
        };
        self.state
            .extracted
            .insert(entry.key.clone(), ContentRecord::Page(record));
        self.state.classified.remove(&entry.url);

        tracing::info!(
            "Extracted {} ({} new links, {} documents)",
            entry.url,
            summary.enqueued,
            summary.documents.len()
        );
        PageOutcome::Extracted(summary)
    }

    fn absorb(&mut self, summary: &LinkSummary) {
        let report = &mut self.report;
        report.documents_downloaded += summary.documents.len() as u64;
        report.documents_skipped += summary.documents_skipped as u64;
        report.duplicates_skipped += summary.duplicates as u64;
        report.out_of_scope += summary.out_of_scope as u64;
        report.media_ignored += summary.media_ignored as u64;
        report.errored += summary.failed as u64;
    }

    /// Saves all registries together with the unprocessed frontier
    fn checkpoint(&mut self) -> Result<()> {
        let pending = self.frontier.pending();
        self.storage.save(&self.state, &pending)?;
        self.since_checkpoint = 0;
        tracing::debug!(
            "Checkpoint saved: {} seen URLs, {} pending entries",
            self.state.seen.len(),
            pending.len()
        );
        Ok(())
    }

    fn transition(&mut self, next: CrawlPhase) {
        if self.phase != next {
            tracing::info!("Crawl phase: {} -> {}", self.phase, next);
            self.phase = next;
        }
    }
}
