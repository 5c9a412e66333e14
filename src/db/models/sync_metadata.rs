use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of one indexing run (PostgreSQL
/// `enscan.indexing_metadata`).
///
/// Rows are only ever inserted; the most recent row supplies the starting
/// point for incremental runs and the history of runs is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Highest block number successfully processed in the run.
    pub last_block_number: i64,
    /// Names that could not be resolved during the run.
    pub fails: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncMetadata {
    pub fn new(last_block_number: i64, fails: Vec<String>) -> Self {
        Self {
            last_block_number,
            fails,
            created_at: Utc::now(),
        }
    }
}
