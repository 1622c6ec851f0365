//! Extracted content store: one record per normalized URL

use crate::extract::{ImageRecord, TableRecord, VideoData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content harvested from a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// URL as it was fetched
    pub url: String,
    pub text: String,
    pub tables: Vec<TableRecord>,
    pub images: Vec<ImageRecord>,
    pub videos: VideoData,
    /// Documents downloaded inline from this page's anchors
    pub documents: Vec<DocumentRecord>,
    pub extracted_at: DateTime<Utc>,
}

/// Metadata of a downloaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    /// Logical filename (no extension)
    pub filename: String,
    /// Format tag the file is registered under
    pub format: String,
    /// Anchor text of the link that led here, empty for seeds
    pub description: String,
    pub local_path: String,
    pub source_page: Option<String>,
    pub downloaded_at: DateTime<Utc>,
}

/// One entry of the extracted data store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRecord {
    Page(PageRecord),
    Document(DocumentRecord),
}

impl ContentRecord {
    /// Short tag stored next to the serialized record
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Page(_) => "page",
            Self::Document(_) => "document",
        }
    }
}

/// Normalized URL → content record, at most one per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDataStore {
    records: BTreeMap<String, ContentRecord>,
}

impl ExtractedDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unless the key already has one
    ///
    /// Returns true if the record was stored.
    pub fn insert(&mut self, key: impl Into<String>, record: ContentRecord) -> bool {
        use std::collections::btree_map::Entry;

        match self.records.entry(key.into()) {
            Entry::Occupied(existing) => {
                tracing::debug!("Extracted record already present for {}", existing.key());
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ContentRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentRecord)> {
        self.records.iter().map(|(key, record)| (key.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| matches!(r, ContentRecord::Page(_)))
            .count()
    }

    pub fn document_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| matches!(r, ContentRecord::Document(_)))
            .count()
    }

    /// Borrowed view for serialization
    pub fn as_map(&self) -> &BTreeMap<String, ContentRecord> {
        &self.records
    }
}
