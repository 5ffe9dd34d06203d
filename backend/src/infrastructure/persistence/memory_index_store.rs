use crate::application::repositories::{IndexRepository, StoreResult};
use crate::domain::aggregates::VectorIndex;
use std::sync::Mutex;
use tracing::debug;

/// Index kept only for the life of the process.
///
/// Lets a set of transcript files be embedded and searched without touching
/// the shared index on disk. It counts as existing once something is saved.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    index: Mutex<Option<VectorIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexRepository for MemoryIndexStore {
    fn exists(&self) -> bool {
        self.index.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn load(&self) -> StoreResult<VectorIndex> {
        let guard = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, index: &VectorIndex) -> StoreResult<()> {
        let mut guard = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        debug!("Holding {} entries in memory", index.len());
        *guard = Some(index.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
