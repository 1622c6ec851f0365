//! Direct-download handler for documents and cloud-drive files

use crate::crawler::fetcher::download_to_file;
use crate::state::{ContentRecord, CrawlState, DocumentRecord, DownloadEntry, UrlClass};
use crate::url::{drive_download_url, normalize_url, FilenameDeriver, DRIVE_FORMAT_TAG};
use chrono::Utc;
use reqwest::Client;
use std::path::PathBuf;
use url::Url;

/// What kind of file a download request points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// A document on the site, saved as `<filename>.<format>`
    Document { format: String },

    /// A cloud-drive file, saved under its file id
    CloudDrive { file_id: String },
}

/// A file the crawl wants on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub target: DownloadTarget,
    /// Anchor text of the link, empty when unknown
    pub description: String,
    pub source_page: Option<String>,
}

/// Result of a download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written and recorded
    Downloaded(DocumentRecord),

    /// Same logical file already recorded under this format tag
    AlreadyPresent { format: String, filename: String },

    /// Download failed; the URL is recorded as Errored
    Failed(String),
}

/// Downloads files at most once per `(format, filename)`
///
/// Documents land in `<download-folder>/<filename>.<format>`; cloud-drive
/// files in `<download-folder>/<file_id>` under the `gdrive` tag.
pub struct DownloadHandler {
    client: Client,
    folder: PathBuf,
    names: FilenameDeriver,
}

impl DownloadHandler {
    pub fn new(client: Client, folder: impl Into<PathBuf>) -> Self {
        Self {
            client,
            folder: folder.into(),
            names: FilenameDeriver::new(),
        }
    }

    /// Downloads and records a file unless it is already registered
    ///
    /// On success the file is appended to the downloadable registry, a
    /// `Document` record is stored under the URL's normalized key, and cloud
    /// URLs join the cloud-hosted registry.
    pub async fn download(
        &mut self,
        state: &mut CrawlState,
        request: DownloadRequest,
    ) -> DownloadOutcome {
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                state.classified.insert(UrlClass::Errored, request.url.as_str());
                return DownloadOutcome::Failed(format!("invalid URL: {}", e));
            }
        };

        let (format, filename, fetch_url, dest) = match &request.target {
            DownloadTarget::Document { format } => {
                let filename = self.names.derive(&url);
                let dest = self.folder.join(format!("{}.{}", filename, format));
                (format.clone(), filename, request.url.clone(), dest)
            }
            DownloadTarget::CloudDrive { file_id } => {
                if state.cloud_hosted.contains(&request.url) {
                    return DownloadOutcome::AlreadyPresent {
                        format: DRIVE_FORMAT_TAG.to_string(),
                        filename: file_id.clone(),
                    };
                }
                (
                    DRIVE_FORMAT_TAG.to_string(),
                    file_id.clone(),
                    drive_download_url(file_id),
                    self.folder.join(file_id),
                )
            }
        };

        if state.downloadables.contains(&format, &filename) {
            tracing::debug!("{}.{} already downloaded, skipping {}", filename, format, request.url);
            return DownloadOutcome::AlreadyPresent { format, filename };
        }

        if let Err(e) = download_to_file(&self.client, &fetch_url, &dest).await {
            tracing::warn!("Download failed for {}: {}", request.url, e);
            state.classified.insert(UrlClass::Errored, request.url.as_str());
            return DownloadOutcome::Failed(e.to_string());
        }

        state.downloadables.push(
            &format,
            DownloadEntry {
                filename: filename.clone(),
                source_url: request.url.clone(),
            },
        );
        if matches!(request.target, DownloadTarget::CloudDrive { .. }) {
            state.cloud_hosted.insert(request.url.as_str());
        }
        state.classified.remove(&request.url);

        let record = DocumentRecord {
            url: request.url.clone(),
            filename,
            format,
            description: request.description,
            local_path: dest.to_string_lossy().into_owned(),
            source_page: request.source_page,
            downloaded_at: Utc::now(),
        };

        state.extracted.insert(
            normalize_url(&request.url, None),
            ContentRecord::Document(record.clone()),
        );

        tracing::info!("Downloaded {} -> {}", request.url, record.local_path);
        DownloadOutcome::Downloaded(record)
    }
}
