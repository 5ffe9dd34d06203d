use super::index_repository::StoreResult;
use crate::domain::aggregates::TranscriptBatch;
use std::path::Path;

/// Repository trait for transcript batches, the per-batch embedding cache.
pub trait TranscriptRepository: Send + Sync {
    /// Loads the batch stored at `locator`.
    ///
    /// Returns `Ok(None)` if no batch exists there, so callers can skip it.
    fn load(&self, locator: &Path) -> StoreResult<Option<TranscriptBatch>>;

    /// Writes the batch back to its own storage, keeping fields this crate
    /// does not interpret.
    fn save(&self, batch: &TranscriptBatch) -> StoreResult<()>;
}
