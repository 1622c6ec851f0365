use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One downloaded file as recorded under its format tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    /// Logical filename (no extension)
    pub filename: String,

    /// URL the file was fetched from
    pub source_url: String,
}

/// Format tag → ordered list of downloaded files
///
/// A `(format, filename)` pair appears at most once; the download handler
/// checks [`DownloadableRegistry::contains`] before fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadableRegistry {
    by_format: BTreeMap<String, Vec<DownloadEntry>>,
}

impl DownloadableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, format: &str, filename: &str) -> bool {
        self.by_format
            .get(format)
            .map(|entries| entries.iter().any(|e| e.filename == filename))
            .unwrap_or(false)
    }

    /// Appends an entry under a format tag
    pub fn push(&mut self, format: &str, entry: DownloadEntry) {
        self.by_format
            .entry(format.to_string())
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, format: &str) -> &[DownloadEntry] {
        self.by_format
            .get(format)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates `(format, position, entry)` in format order then list order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &DownloadEntry)> {
        self.by_format.iter().flat_map(|(format, entries)| {
            entries
                .iter()
                .enumerate()
                .map(move |(position, entry)| (format.as_str(), position, entry))
        })
    }

    /// Per-format counts, including only formats with at least one entry
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.by_format
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(format, entries)| (format.clone(), entries.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.by_format.values().map(Vec::len).sum()
    }
}

/// Raw cloud-drive URLs whose files have already been downloaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudHostedRegistry {
    urls: BTreeSet<String>,
}

impl CloudHostedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
