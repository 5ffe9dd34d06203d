use crate::application::repositories::{IndexRepository, StoreResult};
use serde::Serialize;

/// Summary statistics for a persisted index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub location: String,
    pub exists: bool,
    pub entries: usize,
    pub searchable: usize,
    pub pending: usize,
    pub dimension: Option<usize>,
    /// Distinct media files referenced by the entries
    pub sources: Vec<String>,
}

/// Use case for describing the index without modifying it
pub struct DescribeIndex<'a, R: IndexRepository> {
    repository: &'a R,
}

impl<'a, R: IndexRepository> DescribeIndex<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    pub fn execute(&self) -> StoreResult<IndexStats> {
        let exists = self.repository.exists();
        let index = self.repository.load()?;

        Ok(IndexStats {
            location: self.repository.location(),
            exists,
            entries: index.len(),
            searchable: index.searchable_entries().count(),
            pending: index.pending_entries().count(),
            dimension: index.dimension(),
            sources: index.media_files().into_iter().map(str::to_string).collect(),
        })
    }
}
