//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Checkpoint trait.
//! Each save writes only the rows that changed since the previous one.

use crate::crawler::FrontierEntry;
use crate::output::CrawlReport;
use crate::state::{
    ClassificationSets, CloudHostedRegistry, ContentFingerprint, ContentRecord, CrawlState,
    DownloadEntry, DownloadableRegistry, ExtractedDataStore, SeenRegistry, UrlClass,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Checkpoint, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const RUN_COLUMNS: &str = "id, seed, config_hash, started_at, finished_at, status,
    pages_extracted, documents_downloaded, documents_skipped, out_of_scope, unfetchable,
    errored, duplicates_skipped, media_ignored, waves, entries_processed, seed_was_duplicate";

/// SQLite storage backend
///
/// Saves are incremental: the backend remembers which registry rows the
/// database already holds and writes only the difference. The row index is
/// read from the database on the first save through a handle.
pub struct SqliteStorage {
    conn: Connection,
    saved: Option<SavedRows>,
}

/// Registry rows currently stored in the database
///
/// Extracted records are written once per key and never rewritten, matching
/// the insert-once rule of the extracted data store.
#[derive(Debug, Default)]
struct SavedRows {
    seen: HashMap<String, (i64, Option<String>)>,
    classified: HashSet<(String, String)>,
    downloadables: HashMap<(String, i64), DownloadEntry>,
    extracted: HashSet<String>,
    cloud_hosted: HashSet<String>,
}

/// Row counts written by one save
#[derive(Debug, Default)]
struct SaveStats {
    written: usize,
    deleted: usize,
}

impl SqliteStorage {
    /// Opens or creates the checkpoint database at `path`
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn, saved: None })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, saved: None })
    }

    /// Reads the keys of every registry row already in the database
    fn read_saved_rows(&self) -> StorageResult<SavedRows> {
        let mut rows = SavedRows::default();

        let mut stmt = self
            .conn
            .prepare("SELECT normalized_url, position, fingerprint FROM seen_urls")?;
        for row in stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                (row.get::<_, i64>(1)?, row.get::<_, Option<String>>(2)?),
            ))
        })? {
            let (key, value) = row?;
            rows.seen.insert(key, value);
        }

        let mut stmt = self.conn.prepare("SELECT url, class FROM classified_urls")?;
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            rows.classified.insert(row?);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT format, position, filename, source_url FROM downloadables")?;
        for row in stmt.query_map([], |row| {
            Ok((
                (row.get::<_, String>(0)?, row.get::<_, i64>(1)?),
                DownloadEntry {
                    filename: row.get(2)?,
                    source_url: row.get(3)?,
                },
            ))
        })? {
            let (slot, entry) = row?;
            rows.downloadables.insert(slot, entry);
        }

        let mut stmt = self.conn.prepare("SELECT normalized_url FROM extracted_data")?;
        for row in stmt.query_map([], |row| row.get::<_, String>(0))? {
            rows.extracted.insert(row?);
        }

        let mut stmt = self.conn.prepare("SELECT url FROM cloud_hosted")?;
        for row in stmt.query_map([], |row| row.get::<_, String>(0))? {
            rows.cloud_hosted.insert(row?);
        }

        Ok(rows)
    }

    fn load_seen(&self) -> StorageResult<SeenRegistry> {
        let mut stmt = self
            .conn
            .prepare("SELECT normalized_url, fingerprint FROM seen_urls ORDER BY position")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (key, digest) in rows {
            let fingerprint = match digest {
                Some(digest) => Some(ContentFingerprint::from_hex(&digest).ok_or_else(|| {
                    StorageError::Corrupt(format!("invalid fingerprint for {}", key))
                })?),
                None => None,
            };
            entries.push((key, fingerprint));
        }

        Ok(SeenRegistry::from_entries(entries))
    }

    fn load_classified(&self) -> StorageResult<ClassificationSets> {
        let mut stmt = self.conn.prepare("SELECT url, class FROM classified_urls")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sets = ClassificationSets::new();
        for (url, class) in rows {
            let class = UrlClass::from_db_string(&class)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown URL class '{}'", class)))?;
            sets.insert(class, url);
        }
        Ok(sets)
    }

    fn load_downloadables(&self) -> StorageResult<DownloadableRegistry> {
        let mut stmt = self.conn.prepare(
            "SELECT format, filename, source_url FROM downloadables ORDER BY format, position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    DownloadEntry {
                        filename: row.get(1)?,
                        source_url: row.get(2)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut registry = DownloadableRegistry::new();
        for (format, entry) in rows {
            registry.push(&format, entry);
        }
        Ok(registry)
    }

    fn load_extracted(&self) -> StorageResult<ExtractedDataStore> {
        let mut stmt = self
            .conn
            .prepare("SELECT normalized_url, record FROM extracted_data")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut store = ExtractedDataStore::new();
        for (key, json) in rows {
            let record: ContentRecord = serde_json::from_str(&json)?;
            store.insert(key, record);
        }
        Ok(store)
    }

    fn load_cloud_hosted(&self) -> StorageResult<CloudHostedRegistry> {
        let mut stmt = self.conn.prepare("SELECT url FROM cloud_hosted")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut registry = CloudHostedRegistry::new();
        for url in urls {
            registry.insert(url);
        }
        Ok(registry)
    }
}

/// Maps a `runs` row selected with [`RUN_COLUMNS`]
fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let count = |idx: usize| -> rusqlite::Result<u64> { Ok(row.get::<_, i64>(idx)?.max(0) as u64) };

    Ok(RunRecord {
        id: row.get(0)?,
        seed: row.get(1)?,
        config_hash: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        report: CrawlReport {
            seed: row.get(1)?,
            pages_extracted: count(6)?,
            documents_downloaded: count(7)?,
            documents_skipped: count(8)?,
            out_of_scope: count(9)?,
            unfetchable: count(10)?,
            errored: count(11)?,
            duplicates_skipped: count(12)?,
            media_ignored: count(13)?,
            waves: count(14)?,
            entries_processed: count(15)?,
            seed_was_duplicate: row.get::<_, i64>(16)? != 0,
        },
    })
}

/// Upserts changed registry rows and deletes rows the state no longer holds
///
/// `saved` is updated to describe the database after the transaction commits.
fn write_state_diff(
    tx: &Transaction<'_>,
    state: &CrawlState,
    saved: &mut SavedRows,
) -> StorageResult<SaveStats> {
    let mut stats = SaveStats::default();

    // ===== Seen URLs =====
    let mut live = HashSet::with_capacity(state.seen.len());
    {
        let mut upsert = tx.prepare(
            "INSERT INTO seen_urls (normalized_url, fingerprint, position) VALUES (?1, ?2, ?3)
             ON CONFLICT(normalized_url) DO UPDATE SET
                fingerprint = excluded.fingerprint,
                position = excluded.position",
        )?;
        for (position, (key, fingerprint)) in state.seen.iter().enumerate() {
            live.insert(key);
            let row = (
                position as i64,
                fingerprint.map(|fp| fp.as_str().to_string()),
            );
            if saved.seen.get(key) == Some(&row) {
                continue;
            }
            upsert.execute(params![key, row.1, row.0])?;
            saved.seen.insert(key.to_string(), row);
            stats.written += 1;
        }
    }
    let stale: Vec<String> = saved
        .seen
        .keys()
        .filter(|key| !live.contains(key.as_str()))
        .cloned()
        .collect();
    for key in stale {
        tx.execute("DELETE FROM seen_urls WHERE normalized_url = ?1", params![key])?;
        saved.seen.remove(&key);
        stats.deleted += 1;
    }

    // ===== Classification sets =====
    let current: HashSet<(String, String)> = state
        .classified
        .iter()
        .map(|(class, url)| (url.to_string(), class.to_db_string().to_string()))
        .collect();
    for (url, class) in saved.classified.difference(&current) {
        tx.execute(
            "DELETE FROM classified_urls WHERE url = ?1 AND class = ?2",
            params![url, class],
        )?;
        stats.deleted += 1;
    }
    for (url, class) in current.difference(&saved.classified) {
        tx.execute(
            "INSERT OR IGNORE INTO classified_urls (url, class) VALUES (?1, ?2)",
            params![url, class],
        )?;
        stats.written += 1;
    }
    saved.classified = current;

    // ===== Downloadables =====
    let mut live = HashSet::new();
    {
        let mut upsert = tx.prepare(
            "INSERT INTO downloadables (format, position, filename, source_url) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(format, position) DO UPDATE SET
                filename = excluded.filename,
                source_url = excluded.source_url",
        )?;
        for (format, position, entry) in state.downloadables.iter() {
            let slot = (format.to_string(), position as i64);
            if saved.downloadables.get(&slot) != Some(entry) {
                upsert.execute(params![slot.0, slot.1, entry.filename, entry.source_url])?;
                saved.downloadables.insert(slot.clone(), entry.clone());
                stats.written += 1;
            }
            live.insert(slot);
        }
    }
    let stale: Vec<(String, i64)> = saved
        .downloadables
        .keys()
        .filter(|slot| !live.contains(*slot))
        .cloned()
        .collect();
    for slot in stale {
        tx.execute(
            "DELETE FROM downloadables WHERE format = ?1 AND position = ?2",
            params![slot.0, slot.1],
        )?;
        saved.downloadables.remove(&slot);
        stats.deleted += 1;
    }

    // ===== Extracted data =====
    {
        let mut insert = tx.prepare(
            "INSERT OR REPLACE INTO extracted_data (normalized_url, kind, record) VALUES (?1, ?2, ?3)",
        )?;
        for (key, record) in state.extracted.iter() {
            if saved.extracted.contains(key) {
                continue;
            }
            let json = serde_json::to_string(record)?;
            insert.execute(params![key, record.kind(), json])?;
            saved.extracted.insert(key.to_string());
            stats.written += 1;
        }
    }
    let stale: Vec<String> = saved
        .extracted
        .iter()
        .filter(|key| !state.extracted.contains(key))
        .cloned()
        .collect();
    for key in stale {
        tx.execute("DELETE FROM extracted_data WHERE normalized_url = ?1", params![key])?;
        saved.extracted.remove(&key);
        stats.deleted += 1;
    }

    // ===== Cloud-hosted URLs =====
    for url in state.cloud_hosted.iter() {
        if saved.cloud_hosted.insert(url.to_string()) {
            tx.execute("INSERT OR IGNORE INTO cloud_hosted (url) VALUES (?1)", params![url])?;
            stats.written += 1;
        }
    }
    let stale: Vec<String> = saved
        .cloud_hosted
        .iter()
        .filter(|url| !state.cloud_hosted.contains(url))
        .cloned()
        .collect();
    for url in stale {
        tx.execute("DELETE FROM cloud_hosted WHERE url = ?1", params![url])?;
        saved.cloud_hosted.remove(&url);
        stats.deleted += 1;
    }

    Ok(stats)
}

/// Replaces the pending frontier
fn write_pending(tx: &Transaction<'_>, pending: &[FrontierEntry]) -> StorageResult<()> {
    tx.execute("DELETE FROM pending_frontier", [])?;
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO pending_frontier (normalized_url, raw_url, referrer, position)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, entry) in pending.iter().enumerate() {
        stmt.execute(params![entry.key, entry.url, entry.referrer, position as i64])?;
    }
    Ok(())
}

impl Checkpoint for SqliteStorage {
    // ===== Crawl State =====

    fn load_state(&self) -> StorageResult<CrawlState> {
        let state = CrawlState {
            seen: self.load_seen()?,
            classified: self.load_classified()?,
            downloadables: self.load_downloadables()?,
            extracted: self.load_extracted()?,
            cloud_hosted: self.load_cloud_hosted()?,
        };

        tracing::debug!(
            "Loaded checkpoint: {} seen, {} extracted, {} downloads",
            state.seen.len(),
            state.extracted.len(),
            state.downloadables.total()
        );

        Ok(state)
    }

    fn load_pending(&self) -> StorageResult<Vec<FrontierEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT normalized_url, raw_url, referrer FROM pending_frontier ORDER BY position",
        )?;
        let pending = stmt
            .query_map([], |row| {
                Ok(FrontierEntry {
                    key: row.get(0)?,
                    url: row.get(1)?,
                    referrer: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pending)
    }

    fn save(&mut self, state: &CrawlState, pending: &[FrontierEntry]) -> StorageResult<()> {
        let mut saved = match self.saved.take() {
            Some(saved) => saved,
            None => self.read_saved_rows()?,
        };

        let tx = self.conn.transaction()?;
        let stats = write_state_diff(&tx, state, &mut saved)?;
        write_pending(&tx, pending)?;
        tx.commit()?;

        // only trusted once the transaction is committed
        self.saved = Some(saved);

        tracing::debug!(
            "Checkpoint saved: {} rows written, {} removed, {} pending",
            stats.written,
            stats.deleted,
            pending.len()
        );
        Ok(())
    }

    fn clear_state(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM seen_urls;
            DELETE FROM classified_urls;
            DELETE FROM downloadables;
            DELETE FROM extracted_data;
            DELETE FROM cloud_hosted;
            DELETE FROM pending_frontier;
        ",
        )?;
        self.saved = Some(SavedRows::default());
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed, config_hash, now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
                pages_extracted = ?3, documents_downloaded = ?4, documents_skipped = ?5,
                out_of_scope = ?6, unfetchable = ?7, errored = ?8, duplicates_skipped = ?9,
                media_ignored = ?10, waves = ?11, entries_processed = ?12, seed_was_duplicate = ?13
             WHERE id = ?14",
            params![
                status.to_db_string(),
                now,
                report.pages_extracted as i64,
                report.documents_downloaded as i64,
                report.documents_skipped as i64,
                report.out_of_scope as i64,
                report.unfetchable as i64,
                report.errored as i64,
                report.duplicates_skipped as i64,
                report.media_ignored as i64,
                report.waves as i64,
                report.entries_processed as i64,
                report.seed_was_duplicate,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        Ok(self.conn.query_row(&sql, [], row_to_run).optional()?)
    }

    fn mark_interrupted_runs(&mut self) -> StorageResult<usize> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(updated)
    }
}
