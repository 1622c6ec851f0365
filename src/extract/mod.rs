//! Content extraction collaborators
//!
//! Each extractor works on an already-parsed [`scraper::Html`] document and
//! degrades to empty fields instead of failing. The crawl driver decides what
//! to do with the results.
//!
//! # Components
//!
//! - `page`: paragraph text and HTML tables (written out as CSV)
//! - `image`: `<img>` tags and image links, with an optional annotation step
//! - `video`: YouTube embeds and video links, with YouTube Data API metadata
//! - `links`: anchors to feed the link processor

mod image;
mod links;
mod page;
mod video;

pub use image::{annotate_images, collect_images, Annotation, ImageAnnotator, ImageRecord, NoAnnotation};
pub use links::{collect_anchors, Anchor};
pub use page::{extract_page_content, page_tables_dir, PageContent, TableRecord};
pub use video::{
    collect_videos, enrich_videos, VideoData, VideoKind, VideoMetadata, VideoRecord, YouTubeClient,
    YOUTUBE_API_ENDPOINT,
};

use scraper::{ElementRef, Selector};
use thiserror::Error;

/// Errors raised inside extractors
///
/// These never escape the public extractor functions; they are logged and the
/// affected field is left empty.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YouTube API request failed: {0}")]
    YouTube(#[from] reqwest::Error),

    #[error("YouTube API returned status {0}")]
    YouTubeStatus(u16),

    #[error("Annotation failed: {0}")]
    Annotation(String),
}

/// Parses a CSS selector known at compile time
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Collapses an element's text nodes into one whitespace-normalized string
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the element's parent, used as surrounding context
pub(crate) fn parent_text(element: ElementRef<'_>, levels: usize) -> String {
    let mut current = element;
    for _ in 0..levels {
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    element_text(current)
}
