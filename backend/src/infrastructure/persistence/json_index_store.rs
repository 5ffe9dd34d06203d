use crate::application::repositories::{IndexRepository, StoreError, StoreResult};
use crate::domain::aggregates::VectorIndex;
use crate::domain::entities::VectorIndexEntry;
use crate::domain::value_objects::{EmbeddingVector, EntryId, SourceRef, TimeRange};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::atomic_write::write_atomically;
use super::schema::{IndexEntryRecord, UNKNOWN_SOURCE};

/// JSON-file implementation of the IndexRepository trait.
///
/// The file is a pretty-printed JSON array of entries so it can be read and
/// diffed by hand.
#[derive(Debug, Clone)]
pub struct JsonIndexStore {
    path: PathBuf,
}

impl JsonIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonIndexStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_from_record(
        &self,
        position: usize,
        record: IndexEntryRecord,
    ) -> StoreResult<Option<VectorIndexEntry>> {
        let corrupt = |reason: String| StoreError::corrupt(&self.path, format!("entry {}: {}", position, reason));

        if record.text.trim().is_empty() {
            warn!("Skipping index entry {} in {} with no text", position, self.path.display());
            return Ok(None);
        }

        let source_ref = SourceRef::new(
            record
                .source_ref
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        )
        .map_err(|e| corrupt(e.to_string()))?;

        let id = match record.id {
            Some(id) => EntryId::new(id).map_err(|e| corrupt(e.to_string()))?,
            None => EntryId::for_segment(&source_ref, position),
        };

        let time_range = record.start.and_then(|start| {
            let end = record.end.unwrap_or(start).max(start);
            TimeRange::new(start, end)
                .map_err(|e| {
                    warn!(
                        "Ignoring time range of index entry {} in {}: {}",
                        position,
                        self.path.display(),
                        e
                    )
                })
                .ok()
        });

        let entry = VectorIndexEntry::new(id, record.text, source_ref, time_range)
            .map_err(|e| corrupt(e.to_string()))?;

        // An empty vector marks the entry as pending embedding
        if record.vector.is_empty() {
            return Ok(Some(entry));
        }
        let vector = EmbeddingVector::new(record.vector).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(entry.with_vector(vector)))
    }
}

impl IndexRepository for JsonIndexStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> StoreResult<VectorIndex> {
        if !self.path.exists() {
            debug!("No index at {}, starting empty", self.path.display());
            return Ok(VectorIndex::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        let records: Vec<IndexEntryRecord> =
            serde_json::from_str(&content).map_err(|e| StoreError::corrupt(&self.path, e))?;

        let mut entries = Vec::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            if let Some(entry) = self.entry_from_record(position, record)? {
                entries.push(entry);
            }
        }

        let index =
            VectorIndex::from_entries(entries).map_err(|e| StoreError::corrupt(&self.path, e))?;

        debug!(
            "Loaded {} entries ({} pending) from {}",
            index.len(),
            index.pending_entries().count(),
            self.path.display()
        );
        Ok(index)
    }

    fn save(&self, index: &VectorIndex) -> StoreResult<()> {
        let records: Vec<IndexEntryRecord> = index.entries().map(IndexEntryRecord::from).collect();

        let json = serde_json::to_string_pretty(&records).map_err(|e| StoreError::Persistence {
            path: self.path.clone(),
            source: e.into(),
        })?;

        write_atomically(&self.path, json.as_bytes()).map_err(|source| StoreError::Persistence {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved {} index entries to {}", records.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
