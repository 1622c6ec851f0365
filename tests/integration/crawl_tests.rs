//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small college site and run the full
//! crawl cycle end-to-end with the plain HTTP browser backend.

use async_trait::async_trait;
use campus_harvest::config::{
    BrowserConfig, BrowserMode, Config, CrawlerConfig, FormatConfig, StorageConfig,
    UserAgentConfig, VideoConfig,
};
use campus_harvest::crawler::{Coordinator, FrontierEntry};
use campus_harvest::extract::{Annotation, ExtractError, ImageAnnotator, ImageRecord, YouTubeClient};
use campus_harvest::state::{ContentRecord, CrawlState, UrlClass};
use campus_harvest::storage::{Checkpoint, RunStatus, SqliteStorage};
use campus_harvest::{normalize_url, ContentFingerprint};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in `dir`, scoped to the mock server
fn create_test_config(dir: &TempDir) -> Config {
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    Config {
        crawler: CrawlerConfig {
            site_domains: vec!["127.0.0.1".to_string()],
            seeds: vec![],
            settle_delay_ms: 0,
            request_timeout_secs: 5,
            checkpoint_interval: 25,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://site.edu/contact".to_string(),
            contact_email: "test@site.edu".to_string(),
        },
        storage: StorageConfig {
            checkpoint_path: path("state.db"),
            download_folder: path("downloads"),
            tables_folder: path("tables"),
        },
        browser: BrowserConfig {
            mode: BrowserMode::Http,
            ..BrowserConfig::default()
        },
        formats: FormatConfig::default(),
        video: VideoConfig::default(),
    }
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn accept_head(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(server)
        .await;
}

/// Home page linking to tracking variants, a document twice, media and
/// out-of-scope hosts
fn home_page(base: &str, outside: &str) -> String {
    format!(
        r#"<html><body>
        <p>Welcome to the college.</p>
        <table>
          <tr><th>Term</th><th>Starts</th></tr>
          <tr><td>Fall</td><td>September</td></tr>
        </table>
        <a href="{base}/about">About</a>
        <a href="{base}/about?utm_source=newsletter">About us</a>
        <a href="/docs/doc.pdf">Course catalog</a>
        <a href="/docs/doc.pdf#section2">Catalog, section 2</a>
        <a href="/img/logo.png">Logo</a>
        <a href="http://mirror.site.edu/about">Mirror</a>
        <a href="{outside}/outside">Partner</a>
        </body></html>"#
    )
}

async fn mount_site(server: &MockServer) -> String {
    let base = server.uri();
    // same server, reached through a host that is not in scope
    let outside = base.replace("127.0.0.1", "localhost");

    accept_head(server).await;
    mount_html(server, "/", home_page(&base, &outside)).await;
    mount_html(
        server,
        "/about",
        r#"<html><body><p>About the college.</p><a href="/">Home</a></body></html>"#.to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/docs/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/outside"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;

    base
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(&format!("{}/", base)).await.unwrap();

    assert_eq!(report.waves, 2);
    assert_eq!(report.entries_processed, 2);
    assert_eq!(report.pages_extracted, 2);
    assert_eq!(report.documents_downloaded, 1);
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.media_ignored, 1);
    assert_eq!(report.out_of_scope, 2);
    assert_eq!(report.errored, 0);
    // tracking-parameter variant on the home page, link back home on /about
    assert_eq!(report.duplicates_skipped, 2);

    let state = coordinator.state();
    let about_key = normalize_url(&format!("{}/about", base), None);
    assert_eq!(
        about_key,
        normalize_url(&format!("{}/about?utm_source=newsletter", base), None)
    );
    assert!(state.seen.contains_key(&about_key));
    assert!(state.extracted.contains(&about_key));

    let home_key = normalize_url(&format!("{}/", base), None);
    let Some(ContentRecord::Page(home)) = state.extracted.get(&home_key) else {
        panic!("home page not extracted");
    };
    assert!(home.text.contains("Welcome to the college."));
    assert_eq!(home.tables.len(), 1);
    assert_eq!(home.tables[0].headers, vec!["Term", "Starts"]);
    assert!(Path::new(&home.tables[0].path).exists());
    assert_eq!(home.documents.len(), 1);
    assert_eq!(home.documents[0].description, "Course catalog");

    assert_eq!(state.downloadables.entries("pdf").len(), 1);
    assert_eq!(state.downloadables.entries("pdf")[0].filename, "docs_doc");
    assert!(dir.path().join("downloads").join("docs_doc.pdf").exists());

    assert!(state
        .classified
        .contains(UrlClass::NonScope, "http://mirror.site.edu/about"));
    assert_eq!(state.classified.len(UrlClass::NonScope), 2);
}

#[tokio::test]
async fn test_checkpoint_matches_final_state() {
    let server = MockServer::start().await;
    let base = mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let db_path = config.storage.checkpoint_path.clone();

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(&format!("{}/", base)).await.unwrap();

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    let loaded = storage.load_state().unwrap();
    assert_eq!(&loaded, coordinator.state());
    assert!(storage.load_pending().unwrap().is_empty());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.report, report);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let server = MockServer::start().await;
    let base = mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", base);

    let first_state = {
        let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
        coordinator.run(&seed).await.unwrap();
        coordinator.state().clone()
    };

    let mut coordinator = Coordinator::new(config, false).unwrap();
    let report = coordinator.run(&format!("{}/?utm_campaign=spring", base)).await.unwrap();

    assert!(report.seed_was_duplicate);
    assert_eq!(report.waves, 0);
    assert_eq!(report.entries_processed, 0);
    assert_eq!(coordinator.state(), &first_state);
    // the document mock expects exactly one download across both runs
}

#[tokio::test]
async fn test_page_timeout_is_errored_and_wave_continues() {
    let server = MockServer::start().await;
    let base = server.uri();
    accept_head(&server).await;

    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/slow">Slow</a><a href="/fine">Fine</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(&server, "/fine", "<p>Fine page</p>".to_string()).await;

    // first GET is the fingerprint fetch; the render that follows hangs
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Slow page</p>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>Slow page</p>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.request_timeout_secs = 1;

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(&format!("{}/", base)).await.unwrap();

    assert_eq!(report.errored, 1);
    assert_eq!(report.pages_extracted, 2);

    let state = coordinator.state();
    let slow = format!("{}/slow", base);
    assert!(state.classified.contains(UrlClass::Errored, &slow));
    assert!(state.seen.contains_key(&normalize_url(&slow, None)));
    assert!(!state.extracted.contains(&normalize_url(&slow, None)));
    assert!(state
        .extracted
        .contains(&normalize_url(&format!("{}/fine", base), None)));
}

#[tokio::test]
async fn test_resumes_pending_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();
    accept_head(&server).await;
    mount_html(&server, "/about", "<p>About</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Home</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    // state of a run interrupted after discovering /about
    let about_url = format!("{}/about", base);
    let about_key = normalize_url(&about_url, None);
    let home_key = normalize_url(&format!("{}/", base), None);
    {
        let mut storage = SqliteStorage::new(Path::new(&config.storage.checkpoint_path)).unwrap();
        let mut state = CrawlState::new();
        state
            .seen
            .record(home_key.clone(), Some(ContentFingerprint::of_bytes(b"<p>Home</p>")));
        state.seen.record(
            about_key.clone(),
            Some(ContentFingerprint::of_bytes(b"<p>About</p>")),
        );
        let pending = FrontierEntry {
            key: about_key.clone(),
            url: about_url,
            referrer: Some(format!("{}/", base)),
        };
        storage.save(&state, &[pending]).unwrap();
        storage.create_run(&format!("{}/", base), "hash").unwrap();
    }

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    assert_eq!(coordinator.pending_len(), 1);

    let report = coordinator.run(&format!("{}/", base)).await.unwrap();

    assert_eq!(report.waves, 1);
    assert_eq!(report.pages_extracted, 1);
    assert!(coordinator.state().extracted.contains(&about_key));
    assert!(!coordinator.state().extracted.contains(&home_key));

    let storage = SqliteStorage::new(Path::new(&config.storage.checkpoint_path)).unwrap();
    assert!(storage.load_pending().unwrap().is_empty());

    let first_run = storage.get_run(1).unwrap();
    assert_eq!(first_run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_periodic_checkpoint_interval_one() {
    let server = MockServer::start().await;
    let base = mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.checkpoint_interval = 1;
    let db_path = config.storage.checkpoint_path.clone();

    let mut coordinator = Coordinator::new(config, true).unwrap();
    let report = coordinator.run(&format!("{}/", base)).await.unwrap();
    assert_eq!(report.pages_extracted, 2);

    let storage = SqliteStorage::new(Path::new(&db_path)).unwrap();
    assert_eq!(&storage.load_state().unwrap(), coordinator.state());
}

struct SignAnnotator;

#[async_trait]
impl ImageAnnotator for SignAnnotator {
    async fn annotate(&self, image: &ImageRecord) -> Result<Annotation, ExtractError> {
        Ok(Annotation {
            ocr_text: format!("text of {}", image.description),
            caption: "a campus building".to_string(),
        })
    }
}

#[tokio::test]
async fn test_collaborators_fill_media_metadata() {
    let server = MockServer::start().await;
    let base = server.uri();
    accept_head(&server).await;
    mount_html(
        &server,
        "/media",
        r#"<html><body>
        <p>Visit us.</p>
        <img src="/img/hall.png" alt="Main Hall">
        <iframe src="https://www.youtube.com/embed/abc123" title="Campus tour"></iframe>
        </body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"snippet": {"title": "Campus Tour 2024", "channelTitle": "Site University"}}]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let youtube = YouTubeClient::new(reqwest::Client::new(), Some("test-key".to_string()))
        .with_endpoint(format!("{}/youtube/v3/videos", base));

    let mut coordinator = Coordinator::new(create_test_config(&dir), true)
        .unwrap()
        .with_annotator(Box::new(SignAnnotator))
        .with_youtube(youtube);
    let report = coordinator.run(&format!("{}/media", base)).await.unwrap();
    assert_eq!(report.pages_extracted, 1);

    let key = normalize_url(&format!("{}/media", base), None);
    let Some(ContentRecord::Page(page)) = coordinator.state().extracted.get(&key) else {
        panic!("media page not extracted");
    };

    assert_eq!(page.images.len(), 1);
    assert_eq!(page.images[0].description, "Main Hall");
    assert_eq!(page.images[0].description_ocr, "text of Main Hall");
    assert_eq!(page.images[0].description_caption, "a campus building");

    assert_eq!(page.videos.embedded.len(), 1);
    assert_eq!(page.videos.embedded[0].metadata.title, "Campus Tour 2024");
    assert_eq!(page.videos.embedded[0].metadata.channel_title, "Site University");
}
