//! Storage module for offline catalog snapshots
//!
//! The catalog itself lives in memory; the only persistence is a JSON
//! snapshot that a live run can write and an offline run can load instead of
//! fetching anything.

mod snapshot;

pub use snapshot::{load_offline, load_snapshot, save_snapshot};

use thiserror::Error;

/// Errors that can occur while reading or writing a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot file not found: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
