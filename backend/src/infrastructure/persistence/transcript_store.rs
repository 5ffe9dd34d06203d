use crate::application::repositories::{StoreError, StoreResult, TranscriptRepository};
use crate::domain::aggregates::TranscriptBatch;
use crate::domain::value_objects::SourceRef;
use crate::infrastructure::parsers::TranscriptJsonParser;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::atomic_write::write_atomically;

/// Transcript batches stored as JSON files on the local filesystem.
///
/// A batch's source reference is the path it was loaded from, so `save`
/// writes back to the same file.
#[derive(Debug, Clone, Default)]
pub struct JsonTranscriptStore;

impl JsonTranscriptStore {
    pub fn new() -> Self {
        JsonTranscriptStore
    }
}

impl TranscriptRepository for JsonTranscriptStore {
    fn load(&self, locator: &Path) -> StoreResult<Option<TranscriptBatch>> {
        if !locator.exists() {
            debug!("Transcript batch {} does not exist", locator.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(locator).map_err(|source| StoreError::Read {
            path: locator.to_path_buf(),
            source,
        })?;

        let source = SourceRef::new(locator.to_string_lossy())
            .map_err(|e| StoreError::corrupt(locator, e))?;

        let batch = TranscriptJsonParser::parse_content(&content, source)
            .map_err(|e| StoreError::corrupt(locator, e))?;

        debug!(
            "Loaded {} segments from {}",
            batch.segments().len(),
            locator.display()
        );
        Ok(Some(batch))
    }

    fn save(&self, batch: &TranscriptBatch) -> StoreResult<()> {
        let path = PathBuf::from(batch.source().as_str());

        let json = TranscriptJsonParser::render(batch).map_err(|e| StoreError::Persistence {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;

        write_atomically(&path, json.as_bytes())
            .map_err(|source| StoreError::Persistence { path, source })
    }
}
