//! Link classification
//!
//! Decides what the crawl does with a URL. The first four rules only look at
//! the URL itself; a page candidate is then probed over the network.

use crate::config::{Config, FormatConfig};
use crate::crawler::fetcher::probe;
use crate::url::{drive_file_id, path_extension, SiteScope};
use reqwest::Client;
use url::Url;

/// What the crawl should do with a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    /// Host outside the site scope; recorded, never fetched
    OutOfScope,

    /// Image or video file; ignored
    MediaAsset,

    /// Document to download, tagged with its format
    Downloadable { format: String },

    /// Cloud-drive file link, downloaded through its direct URL
    CloudHosted { file_id: String },

    /// HEAD probe succeeded; render and extract
    FetchablePage,

    /// HEAD probe failed
    Unfetchable,
}

impl LinkClass {
    /// Returns true if the URL leads to a file download
    pub fn is_download(&self) -> bool {
        matches!(self, Self::Downloadable { .. } | Self::CloudHosted { .. })
    }
}

/// Classifies URLs against the site scope and the configured formats
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    scope: SiteScope,
    documents: Vec<String>,
    media: Vec<String>,
}

impl LinkClassifier {
    pub fn new(scope: SiteScope, formats: &FormatConfig) -> Self {
        let media = formats
            .images
            .iter()
            .chain(formats.videos.iter())
            .map(|f| f.to_lowercase())
            .collect();

        Self {
            scope,
            documents: formats.documents.iter().map(|f| f.to_lowercase()).collect(),
            media,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SiteScope::new(&config.crawler.site_domains), &config.formats)
    }

    /// Applies the URL-only rules
    ///
    /// # Priority
    ///
    /// 1. OutOfScope: host not in scope and not a cloud-drive file link
    /// 2. MediaAsset: extension in the image/video set
    /// 3. Downloadable: extension in the document set
    /// 4. CloudHosted: cloud-drive file link
    ///
    /// Returns `None` for a page candidate that still needs a probe. A URL
    /// that does not parse is OutOfScope.
    pub fn classify_static(&self, raw: &str) -> Option<LinkClass> {
        let Ok(url) = Url::parse(raw.trim()) else {
            return Some(LinkClass::OutOfScope);
        };

        let drive_id = drive_file_id(&url);

        if !self.scope.contains(&url) && drive_id.is_none() {
            return Some(LinkClass::OutOfScope);
        }

        if let Some(ext) = path_extension(&url) {
            if self.media.contains(&ext) {
                return Some(LinkClass::MediaAsset);
            }
            if self.documents.contains(&ext) {
                return Some(LinkClass::Downloadable { format: ext });
            }
        }

        drive_id.map(|file_id| LinkClass::CloudHosted { file_id })
    }

    /// Full classification, probing page candidates with HEAD
    pub async fn classify(&self, client: &Client, raw: &str) -> LinkClass {
        if let Some(class) = self.classify_static(raw) {
            return class;
        }

        match probe(client, raw).await {
            Ok(_) => LinkClass::FetchablePage,
            Err(e) => {
                tracing::debug!("Probe failed for {}: {}", raw, e);
                LinkClass::Unfetchable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(domains: &[&str]) -> LinkClassifier {
        let domains: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
        LinkClassifier::new(SiteScope::new(&domains), &FormatConfig::default())
    }

    #[test]
    fn test_out_of_scope_host() {
        let c = classifier(&["site.edu"]);
        assert_eq!(
            c.classify_static("http://mirror.site.edu/page"),
            Some(LinkClass::OutOfScope)
        );
        assert_eq!(
            c.classify_static("https://other.org/doc.pdf"),
            Some(LinkClass::OutOfScope)
        );
    }

    #[test]
    fn test_unparseable_is_out_of_scope() {
        let c = classifier(&["site.edu"]);
        assert_eq!(c.classify_static("not a url"), Some(LinkClass::OutOfScope));
    }

    #[test]
    fn test_media_before_documents() {
        let c = classifier(&["site.edu"]);
        assert_eq!(
            c.classify_static("http://site.edu/img/logo.PNG"),
            Some(LinkClass::MediaAsset)
        );
        assert_eq!(
            c.classify_static("http://site.edu/clips/tour.mp4"),
            Some(LinkClass::MediaAsset)
        );
    }

    #[test]
    fn test_downloadable_formats() {
        let c = classifier(&["site.edu"]);
        assert_eq!(
            c.classify_static("http://site.edu/forms/apply.pdf#page=2"),
            Some(LinkClass::Downloadable {
                format: "pdf".to_string()
            })
        );
        assert_eq!(
            c.classify_static("http://site.edu/budget.XLSX"),
            Some(LinkClass::Downloadable {
                format: "xlsx".to_string()
            })
        );
    }

    #[test]
    fn test_cloud_drive_link_in_scope() {
        let c = classifier(&["site.edu"]);
        assert_eq!(
            c.classify_static("https://drive.google.com/file/d/1AbC/view"),
            Some(LinkClass::CloudHosted {
                file_id: "1AbC".to_string()
            })
        );
        // drive folders are not file links
        assert_eq!(
            c.classify_static("https://drive.google.com/drive/folders/xyz"),
            Some(LinkClass::OutOfScope)
        );
    }

    #[test]
    fn test_page_candidate_needs_probe() {
        let c = classifier(&["*.site.edu"]);
        assert_eq!(c.classify_static("http://library.site.edu/hours"), None);
        assert_eq!(c.classify_static("http://site.edu/"), None);
        assert!(LinkClass::Downloadable {
            format: "pdf".to_string()
        }
        .is_download());
        assert!(!LinkClass::FetchablePage.is_download());
    }

    #[tokio::test]
    async fn test_probe_decides_fetchable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let c = classifier(&["127.0.0.1"]);
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(
            c.classify(&client, &format!("{}/ok", server.uri())).await,
            LinkClass::FetchablePage
        );
        assert_eq!(
            c.classify(&client, &format!("{}/missing", server.uri())).await,
            LinkClass::Unfetchable
        );
    }

    #[tokio::test]
    async fn test_out_of_scope_never_probed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let c = classifier(&["site.edu"]);
        let url = format!("{}/page", server.uri());
        assert_eq!(c.classify(&Client::new(), &url).await, LinkClass::OutOfScope);
    }
}
