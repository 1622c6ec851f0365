//! JSON export of the extracted data store

use crate::state::CrawlState;
use crate::HarvestError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every extracted record as one JSON object keyed by normalized URL
///
/// Records keep their `kind` tag (`page` or `document`) so downstream tools
/// can tell them apart.
///
/// # Returns
///
/// * `Ok(count)` - Number of records written
/// * `Err(HarvestError)` - Failed to create or write the file
pub fn export_extracted(state: &CrawlState, path: &Path) -> Result<usize, HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, state.extracted.as_map())?;
    writer.flush()?;

    tracing::info!(
        "Exported {} extracted records to {}",
        state.extracted.len(),
        path.display()
    );
    Ok(state.extracted.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ContentRecord, DocumentRecord};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_tagged_records() {
        let mut state = CrawlState::new();
        state.extracted.insert(
            "http://site.edu/doc.pdf",
            ContentRecord::Document(DocumentRecord {
                url: "http://site.edu/doc.pdf".to_string(),
                filename: "doc".to_string(),
                format: "pdf".to_string(),
                description: "Catalog".to_string(),
                local_path: "./fetched_downloadables/doc.pdf".to_string(),
                source_page: None,
                downloaded_at: Utc::now(),
            }),
        );

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("extracted.json");
        let count = export_extracted(&state, &path).unwrap();
        assert_eq!(count, 1);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let record = &json["http://site.edu/doc.pdf"];
        assert_eq!(record["kind"], "document");
        assert_eq!(record["filename"], "doc");
    }

    #[test]
    fn test_export_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extracted.json");
        assert_eq!(export_extracted(&CrawlState::new(), &path).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
