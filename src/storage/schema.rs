//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Campus-Harvest
//! checkpoint database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    pages_extracted INTEGER NOT NULL DEFAULT 0,
    documents_downloaded INTEGER NOT NULL DEFAULT 0,
    documents_skipped INTEGER NOT NULL DEFAULT 0,
    out_of_scope INTEGER NOT NULL DEFAULT 0,
    unfetchable INTEGER NOT NULL DEFAULT 0,
    errored INTEGER NOT NULL DEFAULT 0,
    duplicates_skipped INTEGER NOT NULL DEFAULT 0,
    media_ignored INTEGER NOT NULL DEFAULT 0,
    waves INTEGER NOT NULL DEFAULT 0,
    entries_processed INTEGER NOT NULL DEFAULT 0,
    seed_was_duplicate INTEGER NOT NULL DEFAULT 0
);

-- Every normalized URL admitted to the crawl
CREATE TABLE IF NOT EXISTS seen_urls (
    normalized_url TEXT PRIMARY KEY,
    fingerprint TEXT,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seen_urls_position ON seen_urls(position);

-- NonScope / Unfetchable / Errored diagnostic sets
CREATE TABLE IF NOT EXISTS classified_urls (
    url TEXT NOT NULL,
    class TEXT NOT NULL,
    PRIMARY KEY (url, class)
);

-- Downloaded files per format tag, in download order
CREATE TABLE IF NOT EXISTS downloadables (
    format TEXT NOT NULL,
    position INTEGER NOT NULL,
    filename TEXT NOT NULL,
    source_url TEXT NOT NULL,
    PRIMARY KEY (format, position)
);

-- Extracted page and document records as JSON
CREATE TABLE IF NOT EXISTS extracted_data (
    normalized_url TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    record TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_extracted_kind ON extracted_data(kind);

-- Cloud-drive URLs already downloaded
CREATE TABLE IF NOT EXISTS cloud_hosted (
    url TEXT PRIMARY KEY
);

-- Frontier entries not yet processed at the last periodic checkpoint
CREATE TABLE IF NOT EXISTS pending_frontier (
    normalized_url TEXT PRIMARY KEY,
    raw_url TEXT NOT NULL,
    referrer TEXT,
    position INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The SQLite connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
