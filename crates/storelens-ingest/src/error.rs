use std::time::Duration;

use storelens_db::DbError;
use thiserror::Error;

/// Stream-level ingestion failures. Any of these aborts the run before the
/// store is written; per-row validation failures never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("input stalled: no data within {0:?}")]
    Timeout(Duration),

    #[error("input exceeds the {limit}-byte limit")]
    TooLarge { limit: usize },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to commit batch: {0}")]
    Store(#[from] DbError),
}
