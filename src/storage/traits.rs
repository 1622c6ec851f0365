//! Checkpoint trait and error types

use crate::crawler::FrontierEntry;
use crate::output::CrawlReport;
use crate::state::CrawlState;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt checkpoint row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backends
///
/// A backend must round-trip [`CrawlState`] losslessly: `save` followed by
/// `load_state` yields a state equal to the one saved.
pub trait Checkpoint {
    // ===== Crawl State =====

    /// Loads every registry; empty registries if nothing was saved yet
    fn load_state(&self) -> StorageResult<CrawlState>;

    /// Loads frontier entries left unprocessed by an interrupted run
    fn load_pending(&self) -> StorageResult<Vec<FrontierEntry>>;

    /// Saves all registries and replaces the pending frontier, atomically
    ///
    /// # Arguments
    ///
    /// * `state` - The registries to persist
    /// * `pending` - Frontier entries not yet processed (empty once drained)
    fn save(&mut self, state: &CrawlState, pending: &[FrontierEntry]) -> StorageResult<()>;

    /// Deletes all registries and pending entries (run history is kept)
    fn clear_state(&mut self) -> StorageResult<()>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, seed: &str, config_hash: &str) -> StorageResult<i64>;

    /// Sets the final status, finish timestamp and counts of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks every run still `running` as `interrupted`
    ///
    /// # Returns
    ///
    /// Number of runs updated
    fn mark_interrupted_runs(&mut self) -> StorageResult<usize>;
}
