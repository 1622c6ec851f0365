//! Video extraction and YouTube metadata lookup

use crate::extract::{element_text, selector, ExtractError};
use crate::url::{is_http_scheme, path_extension};
use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Default YouTube Data API v3 videos endpoint
pub const YOUTUBE_API_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Where a video reference came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    /// `<iframe>` pointing at `youtube.com/embed/<id>`
    YouTubeEmbed,
    /// Anchor to `youtube.com/watch?v=<id>` or `youtu.be/<id>`
    YouTubeLink,
    /// Anchor to vimeo.com
    VimeoLink,
    /// Anchor to a video file by extension
    FileLink,
}

/// Metadata resolved through the YouTube Data API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub published_at: Option<String>,
    pub channel_title: String,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// ISO 8601 duration as returned by the API (`PT4M13S`)
    pub duration: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// A video referenced by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub kind: VideoKind,
    pub url: String,
    pub video_id: Option<String>,
    /// Anchor text, or the iframe `title` attribute
    pub description: String,
    pub width: Option<String>,
    pub height: Option<String>,
    pub allow: Option<String>,
    pub source_page: String,
    #[serde(default)]
    pub metadata: VideoMetadata,
}

/// Embedded players and video links found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub embedded: Vec<VideoRecord>,
    pub links: Vec<VideoRecord>,
}

impl VideoData {
    pub fn is_empty(&self) -> bool {
        self.embedded.is_empty() && self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.embedded.len() + self.links.len()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut VideoRecord> {
        self.embedded.iter_mut().chain(self.links.iter_mut())
    }
}

/// Collects YouTube embeds and video links from a page
///
/// Metadata is left empty here; see [`enrich_videos`].
pub fn collect_videos(
    document: &Html,
    base_url: &Url,
    source_page: &str,
    video_formats: &[String],
) -> VideoData {
    let mut data = VideoData::default();

    if let Some(iframe) = selector("iframe[src]") {
        for element in document.select(&iframe) {
            let attrs = element.value();
            let Some(url) = attrs.attr("src").and_then(|src| resolve(src, base_url)) else {
                continue;
            };
            let Some(video_id) = youtube_embed_id(&url) else {
                continue;
            };

            data.embedded.push(VideoRecord {
                kind: VideoKind::YouTubeEmbed,
                url: url.to_string(),
                video_id: Some(video_id),
                description: attrs.attr("title").unwrap_or_default().trim().to_string(),
                width: attrs.attr("width").map(str::to_string),
                height: attrs.attr("height").map(str::to_string),
                allow: attrs.attr("allow").map(str::to_string),
                source_page: source_page.to_string(),
                metadata: VideoMetadata::default(),
            });
        }
    }

    if let Some(anchor) = selector("a[href]") {
        let mut seen = HashSet::new();
        for element in document.select(&anchor) {
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve(href, base_url))
            else {
                continue;
            };

            let Some((kind, video_id)) = classify_video_link(&url, video_formats) else {
                continue;
            };

            if !seen.insert(url.to_string()) {
                continue;
            }

            data.links.push(VideoRecord {
                kind,
                url: url.to_string(),
                video_id,
                description: element_text(element),
                width: None,
                height: None,
                allow: None,
                source_page: source_page.to_string(),
                metadata: VideoMetadata::default(),
            });
        }
    }

    data
}

/// Fills metadata for every YouTube video that has an id
///
/// Lookup failures are logged and leave the metadata empty.
pub async fn enrich_videos(client: &YouTubeClient, videos: &mut VideoData) {
    if !client.is_enabled() {
        return;
    }

    for video in videos.iter_mut() {
        if !matches!(video.kind, VideoKind::YouTubeEmbed | VideoKind::YouTubeLink) {
            continue;
        }
        let Some(video_id) = video.video_id.clone() else {
            continue;
        };

        match client.lookup(&video_id).await {
            Ok(Some(metadata)) => video.metadata = metadata,
            Ok(None) => tracing::debug!("No YouTube metadata for video {}", video_id),
            Err(e) => tracing::debug!("YouTube lookup failed for {}: {}", video_id, e),
        }
    }
}

fn resolve(raw: &str, base_url: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base_url.join(raw).ok().filter(is_http_scheme)
}

fn host_is(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| {
            let host = host.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        })
        .unwrap_or(false)
}

fn youtube_embed_id(url: &Url) -> Option<String> {
    if !host_is(url, "youtube.com") && !host_is(url, "youtube-nocookie.com") {
        return None;
    }
    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("embed"), Some(id)) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}

fn classify_video_link(url: &Url, video_formats: &[String]) -> Option<(VideoKind, Option<String>)> {
    if host_is(url, "youtube.com") && url.path() == "/watch" {
        let id = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());
        return Some((VideoKind::YouTubeLink, id));
    }

    if host_is(url, "youtu.be") {
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        return Some((VideoKind::YouTubeLink, id));
    }

    if host_is(url, "vimeo.com") {
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.find(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty()))
            .map(str::to_string);
        return Some((VideoKind::VimeoLink, id));
    }

    let is_file = path_extension(url)
        .map(|ext| video_formats.iter().any(|f| *f == ext))
        .unwrap_or(false);
    is_file.then_some((VideoKind::FileLink, None))
}

/// Client for the YouTube Data API v3
///
/// Without an API key every lookup is skipped and metadata stays empty.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl YouTubeClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            endpoint: YOUTUBE_API_ENDPOINT.to_string(),
        }
    }

    /// Points the client at a different API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Looks up one video; `Ok(None)` when disabled or the id is unknown
    pub async fn lookup(&self, video_id: &str) -> Result<Option<VideoMetadata>, ExtractError> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("id", video_id),
                ("key", api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractError::YouTubeStatus(response.status().as_u16()));
        }

        let body: VideoListResponse = response.json().await?;
        Ok(body.items.into_iter().next().map(VideoMetadata::from))
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    published_at: Option<String>,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

// counts arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl From<VideoItem> for VideoMetadata {
    fn from(item: VideoItem) -> Self {
        let thumbnail_url = item
            .snippet
            .thumbnails
            .high
            .or(item.snippet.thumbnails.default)
            .map(|t| t.url);

        Self {
            title: item.snippet.title,
            description: item.snippet.description,
            tags: item.snippet.tags,
            published_at: item.snippet.published_at,
            channel_title: item.snippet.channel_title,
            view_count: item.statistics.view_count.and_then(|v| v.parse().ok()),
            like_count: item.statistics.like_count.and_then(|v| v.parse().ok()),
            duration: item.content_details.duration,
            thumbnail_url,
        }
    }
}
