//! Crawl state: the registries a crawl reads and appends to
//!
//! All registries are owned by one [`CrawlState`] value that the crawl driver
//! passes by `&mut` into the collaborators that need it. The state is loaded
//! from the checkpoint store at startup and saved back when a wave drains.
//!
//! # Components
//!
//! - `SeenRegistry`: normalized URL → optional content fingerprint
//! - `ClassificationSets`: NonScope, Unfetchable and Errored raw URLs
//! - `DownloadableRegistry`: format tag → downloaded files
//! - `ExtractedDataStore`: normalized URL → page or document record
//! - `CloudHostedRegistry`: cloud-drive URLs already downloaded

mod classification;
mod downloadables;
mod extracted;
mod seen;

// Re-export main types
pub use classification::{ClassificationSets, UrlClass};
pub use downloadables::{CloudHostedRegistry, DownloadEntry, DownloadableRegistry};
pub use extracted::{ContentRecord, DocumentRecord, ExtractedDataStore, PageRecord};
pub use seen::{ContentFingerprint, SeenRegistry};

/// Every registry of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlState {
    pub seen: SeenRegistry,
    pub classified: ClassificationSets,
    pub downloadables: DownloadableRegistry,
    pub extracted: ExtractedDataStore,
    pub cloud_hosted: CloudHostedRegistry,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
            && self.extracted.is_empty()
            && self.downloadables.total() == 0
            && self.cloud_hosted.is_empty()
            && UrlClass::ALL.iter().all(|c| self.classified.len(*c) == 0)
    }
}
