//! Link processor
//!
//! Turns the anchors of a rendered page into inline downloads and
//! next-wave frontier entries.

use crate::crawler::classifier::{LinkClass, LinkClassifier};
use crate::crawler::download::{DownloadHandler, DownloadOutcome, DownloadRequest, DownloadTarget};
use crate::crawler::fetcher::fetch_fingerprint;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::extract::Anchor;
use crate::state::{CrawlState, DocumentRecord, UrlClass};
use crate::url::normalize_url;
use reqwest::Client;
use std::collections::HashSet;

/// What happened to the anchors of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Documents downloaded from this page
    pub documents: Vec<DocumentRecord>,
    /// Candidates pushed into the next wave
    pub enqueued: usize,
    /// Candidates whose key or content was already seen
    pub duplicates: usize,
    /// Document links whose file was already registered
    pub documents_skipped: usize,
    pub out_of_scope: usize,
    pub media_ignored: usize,
    /// Failed downloads and failed fingerprint fetches
    pub failed: usize,
    /// Candidates skipped because their fingerprint already failed this run
    pub failed_before: usize,
}

/// Classifies page anchors and routes them
pub struct LinkProcessor<'a> {
    classifier: &'a LinkClassifier,
    client: &'a Client,
}

impl<'a> LinkProcessor<'a> {
    pub fn new(classifier: &'a LinkClassifier, client: &'a Client) -> Self {
        Self { classifier, client }
    }

    /// Processes the anchors found on `source_page`
    ///
    /// # Routing
    ///
    /// - OutOfScope: recorded as NonScope, never fetched
    /// - MediaAsset: ignored
    /// - Downloadable: downloaded right away through `downloader`
    /// - CloudHosted: recorded without a fingerprint and queued
    /// - page candidates: fingerprinted once, deduplicated by key and
    ///   content, recorded and queued
    ///
    /// A candidate whose fingerprint fetch fails is recorded as Errored and
    /// left out of the seen registry so that a later run tries it again. Its
    /// key goes into `failed_candidates`, and pages processed later in the
    /// same run skip it without another fetch.
    pub async fn process(
        &self,
        anchors: &[Anchor],
        source_page: &str,
        state: &mut CrawlState,
        downloader: &mut DownloadHandler,
        frontier: &mut Frontier,
        failed_candidates: &mut HashSet<String>,
    ) -> LinkSummary {
        let mut summary = LinkSummary::default();

        for anchor in anchors {
            let key = normalize_url(&anchor.url, None);

            match self.classifier.classify_static(&anchor.url) {
                Some(LinkClass::OutOfScope) => {
                    state.classified.insert(UrlClass::NonScope, anchor.url.as_str());
                    summary.out_of_scope += 1;
                }
                Some(LinkClass::MediaAsset) => {
                    tracing::trace!("Ignoring media link {}", anchor.url);
                    summary.media_ignored += 1;
                }
                Some(LinkClass::Downloadable { format }) => {
                    let request = DownloadRequest {
                        url: anchor.url.clone(),
                        target: DownloadTarget::Document { format },
                        description: anchor.text.clone(),
                        source_page: Some(source_page.to_string()),
                    };
                    match downloader.download(state, request).await {
                        DownloadOutcome::Downloaded(record) => summary.documents.push(record),
                        DownloadOutcome::AlreadyPresent { .. } => summary.documents_skipped += 1,
                        DownloadOutcome::Failed(_) => summary.failed += 1,
                    }
                }
                Some(LinkClass::CloudHosted { .. }) => {
                    if state.seen.is_duplicate(&key, None) {
                        summary.duplicates += 1;
                        continue;
                    }
                    state.seen.record(key.clone(), None);
                    if frontier.push_next(entry(key, anchor, source_page)) {
                        summary.enqueued += 1;
                    }
                }
                // Unfetchable is only decided by the probe at dispatch
                Some(LinkClass::FetchablePage) | Some(LinkClass::Unfetchable) | None => {
                    if state.seen.contains_key(&key) {
                        summary.duplicates += 1;
                        continue;
                    }
                    if failed_candidates.contains(&key) {
                        tracing::trace!("Not refetching {}, it already failed this run", anchor.url);
                        summary.failed_before += 1;
                        continue;
                    }

                    let Some(fingerprint) = fetch_fingerprint(self.client, &anchor.url).await
                    else {
                        state.classified.insert(UrlClass::Errored, anchor.url.as_str());
                        failed_candidates.insert(key);
                        summary.failed += 1;
                        continue;
                    };

                    if state.seen.is_duplicate(&key, Some(&fingerprint)) {
                        tracing::debug!(
                            "{} has the same content as {}",
                            anchor.url,
                            state.seen.owner_of(&fingerprint).unwrap_or("?")
                        );
                        summary.duplicates += 1;
                        continue;
                    }

                    state.seen.record(key.clone(), Some(fingerprint));
                    if frontier.push_next(entry(key, anchor, source_page)) {
                        summary.enqueued += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "{}: {} queued, {} documents, {} duplicates, {} out of scope, {} failed",
            source_page,
            summary.enqueued,
            summary.documents.len(),
            summary.duplicates,
            summary.out_of_scope,
            summary.failed
        );

        summary
    }
}

fn entry(key: String, anchor: &Anchor, source_page: &str) -> FrontierEntry {
    FrontierEntry {
        key,
        url: anchor.url.clone(),
        referrer: Some(source_page.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatConfig;
    use crate::url::SiteScope;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn anchor(url: String) -> Anchor {
        Anchor {
            url,
            text: "link".to_string(),
            context: String::new(),
        }
    }

    fn classifier() -> LinkClassifier {
        LinkClassifier::new(
            SiteScope::new(&["127.0.0.1".to_string()]),
            &FormatConfig::default(),
        )
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_routes_each_class() {
        let server = MockServer::start().await;
        mount_page(&server, "/about", "about page").await;
        mount_page(&server, "/forms/apply.pdf", "%PDF").await;

        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let classifier = classifier();
        let processor = LinkProcessor::new(&classifier, &client);
        let mut downloader = DownloadHandler::new(client.clone(), dir.path());
        let mut state = CrawlState::new();
        let mut frontier = Frontier::new();

        let anchors = vec![
            anchor(format!("{}/about", server.uri())),
            anchor(format!("{}/forms/apply.pdf", server.uri())),
            anchor(format!("{}/img/campus.jpg", server.uri())),
            anchor("http://mirror.site.edu/about".to_string()),
        ];

        let summary = processor
            .process(
                &anchors,
                "http://127.0.0.1/",
                &mut state,
                &mut downloader,
                &mut frontier,
                &mut HashSet::new(),
            )
            .await;

        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.documents.len(), 1);
        assert_eq!(summary.media_ignored, 1);
        assert_eq!(summary.out_of_scope, 1);
        assert!(state
            .classified
            .contains(UrlClass::NonScope, "http://mirror.site.edu/about"));
        assert!(state.downloadables.contains("pdf", "forms_apply"));

        frontier.begin_wave();
        let queued = frontier.pop().unwrap();
        assert_eq!(queued.url, format!("{}/about", server.uri()));
        assert_eq!(queued.referrer.as_deref(), Some("http://127.0.0.1/"));
        assert!(state.seen.fingerprint(&queued.key).is_some());
    }

    #[tokio::test]
    async fn test_same_content_different_url_skipped() {
        let server = MockServer::start().await;
        mount_page(&server, "/news", "identical body").await;
        mount_page(&server, "/news-archive", "identical body").await;

        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let classifier = classifier();
        let processor = LinkProcessor::new(&classifier, &client);
        let mut downloader = DownloadHandler::new(client.clone(), dir.path());
        let mut state = CrawlState::new();
        let mut frontier = Frontier::new();

        let anchors = vec![
            anchor(format!("{}/news", server.uri())),
            anchor(format!("{}/news-archive", server.uri())),
            anchor(format!("{}/news?utm_source=x", server.uri())),
        ];

        let summary = processor
            .process(
                &anchors,
                "http://127.0.0.1/",
                &mut state,
                &mut downloader,
                &mut frontier,
                &mut HashSet::new(),
            )
            .await;

        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(frontier.next_len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fingerprint_not_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let classifier = classifier();
        let processor = LinkProcessor::new(&classifier, &client);
        let mut downloader = DownloadHandler::new(client.clone(), dir.path());
        let mut state = CrawlState::new();
        let mut frontier = Frontier::new();
        let url = format!("{}/flaky", server.uri());

        let summary = processor
            .process(
                &[anchor(url.clone())],
                "http://127.0.0.1/",
                &mut state,
                &mut downloader,
                &mut frontier,
                &mut HashSet::new(),
            )
            .await;

        assert_eq!(summary.failed, 1);
        assert!(state.classified.contains(UrlClass::Errored, &url));
        assert!(!state.seen.contains_key(&normalize_url(&url, None)));
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_failed_candidate_fetched_once_per_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken-footer-link"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let classifier = classifier();
        let processor = LinkProcessor::new(&classifier, &client);
        let mut downloader = DownloadHandler::new(client.clone(), dir.path());
        let mut state = CrawlState::new();
        let mut frontier = Frontier::new();
        let mut failed = HashSet::new();
        let url = format!("{}/broken-footer-link", server.uri());

        let mut summaries = Vec::new();
        for page in ["/", "/about", "/admissions"] {
            let summary = processor
                .process(
                    &[anchor(url.clone())],
                    &format!("http://127.0.0.1{}", page),
                    &mut state,
                    &mut downloader,
                    &mut frontier,
                    &mut failed,
                )
                .await;
            summaries.push(summary);
        }

        assert_eq!(summaries[0].failed, 1);
        assert_eq!(summaries[1].failed, 0);
        assert_eq!(summaries[1].failed_before, 1);
        assert_eq!(summaries[2].failed_before, 1);
        assert!(failed.contains(&normalize_url(&url, None)));
        assert!(state.classified.contains(UrlClass::Errored, &url));
        assert!(!state.seen.contains_key(&normalize_url(&url, None)));
    }

    #[tokio::test]
    async fn test_cloud_link_queued_without_fingerprint() {
        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let classifier = classifier();
        let processor = LinkProcessor::new(&classifier, &client);
        let mut downloader = DownloadHandler::new(client.clone(), dir.path());
        let mut state = CrawlState::new();
        let mut frontier = Frontier::new();
        let url = "https://drive.google.com/file/d/1AbC/view".to_string();

        let summary = processor
            .process(
                &[anchor(url.clone()), anchor(url.clone())],
                "http://127.0.0.1/",
                &mut state,
                &mut downloader,
                &mut frontier,
                &mut HashSet::new(),
            )
            .await;

        assert_eq!(summary.enqueued, 1);
        assert_eq!(summary.duplicates, 1);
        let key = normalize_url(&url, None);
        assert!(state.seen.contains_key(&key));
        assert_eq!(state.seen.fingerprint(&key), None);
    }
}
