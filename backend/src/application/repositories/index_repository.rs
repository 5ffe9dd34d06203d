use crate::domain::aggregates::VectorIndex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by durable storage of indexes and transcript batches
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored data at {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn corrupt(path: &Path, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for the durable vector index.
///
/// Implementations must never expose a half-written index to readers.
pub trait IndexRepository: Send + Sync {
    /// Whether an index has ever been saved at this location.
    fn exists(&self) -> bool;

    /// Loads the persisted index.
    ///
    /// Returns an empty index when nothing has been saved yet, and
    /// `StoreError::Corrupt` when stored data cannot be interpreted.
    fn load(&self) -> StoreResult<VectorIndex>;

    /// Atomically replaces the persisted index with `index`.
    fn save(&self, index: &VectorIndex) -> StoreResult<()>;

    /// Human-readable location, used in log lines.
    fn location(&self) -> String;
}
