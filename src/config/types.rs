use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Campus-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub formats: FormatConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Host patterns that are in scope (e.g., "site.edu" or "*.site.edu")
    #[serde(rename = "site-domains")]
    pub site_domains: Vec<String>,

    /// Seed URLs used when none are given on the command line
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Time to let a rendered page settle before reading it (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Timeout for every HTTP request and page navigation (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of processed frontier entries between checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
}

impl CrawlerConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_checkpoint_interval() -> u32 {
    25
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Where crawl state and harvested files are kept
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Folder receiving downloaded documents
    #[serde(rename = "download-folder", default = "default_download_folder")]
    pub download_folder: String,

    /// Folder receiving extracted tables as CSV
    #[serde(rename = "tables-folder", default = "default_tables_folder")]
    pub tables_folder: String,
}

fn default_download_folder() -> String {
    "./fetched_downloadables".to_string()
}

fn default_tables_folder() -> String {
    "./tables".to_string()
}

/// How pages are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    /// Headless Chromium through the DevTools protocol
    #[default]
    Chromium,

    /// Plain HTTP GET, no script execution
    Http,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub mode: BrowserMode,

    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome/Chromium binary; looked up on the system when unset
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            mode: BrowserMode::default(),
            headless: default_headless(),
            chrome_executable: None,
        }
    }
}

fn default_headless() -> bool {
    true
}

/// File extensions driving link classification
#[derive(Debug, Clone, Deserialize)]
pub struct FormatConfig {
    /// Document formats downloaded into the download folder
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,

    /// Image formats, ignored as links and collected from pages
    #[serde(default = "default_images")]
    pub images: Vec<String>,

    /// Video file formats, ignored as links and collected from pages
    #[serde(default = "default_videos")]
    pub videos: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            documents: default_documents(),
            images: default_images(),
            videos: default_videos(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_documents() -> Vec<String> {
    to_strings(&["pdf", "docx", "xlsx", "zip"])
}

fn default_images() -> Vec<String> {
    to_strings(&["png", "jpg", "jpeg", "gif", "svg", "bmp", "webp"])
}

fn default_videos() -> Vec<String> {
    to_strings(&["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm"])
}

/// Video metadata lookup configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoConfig {
    #[serde(rename = "youtube-api-key", default)]
    pub youtube_api_key: Option<String>,
}

impl VideoConfig {
    /// API key from the config file, else from `YOUTUBE_API_KEY`
    pub fn api_key(&self) -> Option<String> {
        self.youtube_api_key
            .clone()
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}
