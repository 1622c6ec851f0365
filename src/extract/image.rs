//! Image extraction and annotation

use crate::extract::{element_text, parent_text, selector, ExtractError};
use crate::url::{is_http_scheme, path_extension};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,

    /// `alt` text for `<img>`, anchor text for image links
    pub description: String,

    /// Text recognized in the image, filled by an [`ImageAnnotator`]
    pub description_ocr: String,

    /// Generated caption, filled by an [`ImageAnnotator`]
    pub description_caption: String,

    /// Lowercased file extension, if the URL has one
    pub format: Option<String>,

    /// Text surrounding the image in the page
    pub sibling_info: String,

    pub timestamp: DateTime<Utc>,
}

/// Output of an annotation model for one image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub ocr_text: String,
    pub caption: String,
}

/// Fills OCR text and captions for images
///
/// The models behind this live outside the crawler; implementations only need
/// to map an image to its annotation.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    async fn annotate(&self, image: &ImageRecord) -> Result<Annotation, ExtractError>;
}

/// Annotator that leaves OCR text and captions empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnnotation;

#[async_trait]
impl ImageAnnotator for NoAnnotation {
    async fn annotate(&self, _image: &ImageRecord) -> Result<Annotation, ExtractError> {
        Ok(Annotation::default())
    }
}

/// Collects `<img>` tags and anchors that point at image files
///
/// Data URIs are skipped. Each image URL is reported once per page.
pub fn collect_images(document: &Html, base_url: &Url, image_formats: &[String]) -> Vec<ImageRecord> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    let now = Utc::now();

    if let Some(img) = selector("img[src]") {
        for element in document.select(&img) {
            let Some(url) = element
                .value()
                .attr("src")
                .and_then(|src| resolve_image(src, base_url))
            else {
                continue;
            };

            if !seen.insert(url.to_string()) {
                continue;
            }

            images.push(ImageRecord {
                url: url.to_string(),
                description: element.value().attr("alt").unwrap_or_default().trim().to_string(),
                description_ocr: String::new(),
                description_caption: String::new(),
                format: path_extension(&url),
                sibling_info: parent_text(element, 2),
                timestamp: now,
            });
        }
    }

    if let Some(anchor) = selector("a[href]") {
        for element in document.select(&anchor) {
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_image(href, base_url))
            else {
                continue;
            };

            let format = path_extension(&url);
            let is_image = format
                .as_ref()
                .map(|ext| image_formats.iter().any(|f| f == ext))
                .unwrap_or(false);

            if !is_image || !seen.insert(url.to_string()) {
                continue;
            }

            images.push(ImageRecord {
                url: url.to_string(),
                description: element_text(element),
                description_ocr: String::new(),
                description_caption: String::new(),
                format,
                sibling_info: parent_text(element, 1),
                timestamp: now,
            });
        }
    }

    images
}

/// Runs the annotator over every image, leaving fields empty on failure
pub async fn annotate_images(annotator: &dyn ImageAnnotator, images: &mut [ImageRecord]) {
    for image in images.iter_mut() {
        match annotator.annotate(image).await {
            Ok(annotation) => {
                image.description_ocr = annotation.ocr_text;
                image.description_caption = annotation.caption;
            }
            Err(e) => {
                tracing::debug!("Annotation failed for {}: {}", image.url, e);
            }
        }
    }
}

fn resolve_image(src: &str, base_url: &Url) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    base_url.join(src).ok().filter(is_http_scheme)
}
