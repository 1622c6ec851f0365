//! Page text and table extraction

use crate::extract::{element_text, selector, ExtractError};
use crate::state::ContentFingerprint;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Text and tables pulled from one rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// All `<p>` texts joined by single spaces
    pub text: String,

    /// Tables written to disk for this page
    pub tables: Vec<TableRecord>,
}

/// A table written out as CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// Position of the table on the page, starting at 0
    pub index: usize,

    /// Path of the CSV file
    pub path: String,

    /// Header cells (`<th>` of the first row), empty if the table has none
    pub headers: Vec<String>,

    /// Number of data rows written
    pub rows: usize,
}

/// Extracts paragraph text and writes every `<table>` as `table_<n>.csv`
///
/// Tables go into `tables_dir`, which is created on demand. A failure while
/// writing tables is logged and leaves `tables` empty; the text is still
/// returned.
pub fn extract_page_content(document: &Html, source_url: &str, tables_dir: &Path) -> PageContent {
    let text = paragraph_text(document);

    let tables = match write_tables(document, tables_dir) {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("Failed to write tables for {}: {}", source_url, e);
            Vec::new()
        }
    };

    PageContent { text, tables }
}

/// Directory holding the tables of one page
///
/// Named after the page key's fingerprint so that two pages never share a
/// directory and a revisit writes to the same place.
pub fn page_tables_dir(root: &Path, page_key: &str) -> PathBuf {
    let digest = ContentFingerprint::of_bytes(page_key.as_bytes());
    root.join(&digest.as_str()[..16])
}

fn paragraph_text(document: &Html) -> String {
    let Some(p) = selector("p") else {
        return String::new();
    };

    document
        .select(&p)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_tables(document: &Html, tables_dir: &Path) -> Result<Vec<TableRecord>, ExtractError> {
    let Some(table_selector) = selector("table") else {
        return Ok(Vec::new());
    };

    let tables: Vec<ElementRef<'_>> = document.select(&table_selector).collect();
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(tables_dir)?;

    let mut records = Vec::with_capacity(tables.len());
    for (index, table) in tables.into_iter().enumerate() {
        let (headers, rows) = parse_table(table);
        let path = tables_dir.join(format!("table_{}.csv", index));

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)?;
        if !headers.is_empty() {
            writer.write_record(&headers)?;
        }
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        records.push(TableRecord {
            index,
            path: path.to_string_lossy().into_owned(),
            headers,
            rows: rows.len(),
        });
    }

    tracing::debug!("Wrote {} tables to {}", records.len(), tables_dir.display());
    Ok(records)
}

/// Splits a table into header cells and data rows
///
/// The header comes from the `<th>` cells of the first row. When the first row
/// has no `<th>`, every row is data.
fn parse_table(table: ElementRef<'_>) -> (Vec<String>, Vec<Vec<String>>) {
    let (Some(tr), Some(th), Some(cell)) = (selector("tr"), selector("th"), selector("td, th")) else {
        return (Vec::new(), Vec::new());
    };

    let rows: Vec<ElementRef<'_>> = table.select(&tr).collect();

    let headers: Vec<String> = rows
        .first()
        .map(|row| row.select(&th).map(element_text).collect())
        .unwrap_or_default();

    let skip = usize::from(!headers.is_empty());
    let data = rows
        .iter()
        .skip(skip)
        .map(|row| row.select(&cell).map(element_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    (headers, data)
}
