/// Domain aggregates
use super::base::{DomainError, DomainResult, Entity};
use super::entities::{TranscriptSegment, VectorIndexEntry};
use super::value_objects::{EmbeddingVector, EntryId, SourceRef};
use std::collections::{BTreeSet, HashMap};

/// The collection of embedded fragments that searches run against.
///
/// All vectors in one index share a single dimensionality. Entry order has
/// no meaning for ranking beyond tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    entries: Vec<VectorIndexEntry>,
    positions: HashMap<EntryId, usize>,
}

/// Outcome of merging entries into an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from entries, validating their dimensionality
    pub fn from_entries(entries: Vec<VectorIndexEntry>) -> DomainResult<Self> {
        let mut index = Self::new();
        index.append(entries)?;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by the vectors in this index, if any has one
    pub fn dimension(&self) -> Option<usize> {
        self.dimension_excluding(None)
    }

    fn dimension_excluding(&self, skip: Option<usize>) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != skip)
            .find_map(|(_, entry)| entry.vector().map(EmbeddingVector::dimension_count))
    }

    fn check_dimension(expected: Option<usize>, vector: &EmbeddingVector) -> DomainResult<()> {
        match expected {
            Some(expected) if expected != vector.dimension_count() => {
                Err(DomainError::DimensionMismatch {
                    expected,
                    actual: vector.dimension_count(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Validate that `entries` agree with each other and with `expected`
    fn check_batch(expected: Option<usize>, entries: &[VectorIndexEntry]) -> DomainResult<()> {
        let mut expected = expected;
        for vector in entries.iter().filter_map(VectorIndexEntry::vector) {
            Self::check_dimension(expected, vector)?;
            expected.get_or_insert(vector.dimension_count());
        }
        Ok(())
    }

    /// Add new entries without checking for duplicate ids.
    ///
    /// Returns the number appended. Nothing is appended if any vector
    /// disagrees with the index dimensionality.
    pub fn append(&mut self, entries: Vec<VectorIndexEntry>) -> DomainResult<usize> {
        Self::check_batch(self.dimension(), &entries)?;

        let count = entries.len();
        for entry in entries {
            self.positions.insert(entry.id().clone(), self.entries.len());
            self.entries.push(entry);
        }
        Ok(count)
    }

    /// Insert entries, replacing any existing entry with the same id
    pub fn merge(&mut self, entries: Vec<VectorIndexEntry>) -> DomainResult<MergeStats> {
        Self::check_batch(self.dimension(), &entries)?;

        let mut stats = MergeStats::default();
        for entry in entries {
            match self.positions.get(entry.id()) {
                Some(&idx) => {
                    self.entries[idx] = entry;
                    stats.updated += 1;
                }
                None => {
                    self.positions.insert(entry.id().clone(), self.entries.len());
                    self.entries.push(entry);
                    stats.inserted += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Replace the vector of an existing entry in place
    pub fn update_vector(&mut self, id: &EntryId, vector: EmbeddingVector) -> DomainResult<()> {
        let idx = *self
            .positions
            .get(id)
            .ok_or_else(|| DomainError::NotFound(format!("Entry {} not found", id)))?;

        Self::check_dimension(self.dimension_excluding(Some(idx)), &vector)?;
        self.entries[idx].set_vector(vector);
        Ok(())
    }

    pub fn get(&self, id: &EntryId) -> Option<&VectorIndexEntry> {
        self.positions.get(id).map(|&idx| &self.entries[idx])
    }

    /// All entries in storage order. Borrowing again restarts the scan.
    pub fn entries(&self) -> std::slice::Iter<'_, VectorIndexEntry> {
        self.entries.iter()
    }

    pub fn searchable_entries(&self) -> impl Iterator<Item = &VectorIndexEntry> + '_ {
        self.entries.iter().filter(|e| e.is_searchable())
    }

    pub fn pending_entries(&self) -> impl Iterator<Item = &VectorIndexEntry> + '_ {
        self.entries.iter().filter(|e| e.is_pending())
    }

    /// Distinct media files referenced by the index
    pub fn media_files(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .map(|e| e.source_ref().media_file())
            .collect()
    }
}

/// An ordered batch of transcript segments with its own backing storage.
///
/// Freshly computed embeddings are recorded on the batch so that a later
/// run can reuse them; `is_dirty` tells the caller a write-back is due.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptBatch {
    source: SourceRef,
    segments: Vec<TranscriptSegment>,
    dirty: bool,
}

impl TranscriptBatch {
    pub fn new(source: SourceRef, segments: Vec<TranscriptSegment>) -> Self {
        TranscriptBatch {
            source,
            segments,
            dirty: false,
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// Segments that carry text worth embedding
    pub fn text_segments(&self) -> impl Iterator<Item = &TranscriptSegment> + '_ {
        self.segments.iter().filter(|s| s.has_text())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the batch as written back
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn segment_mut(&mut self, position: usize) -> DomainResult<&mut TranscriptSegment> {
        let source = &self.source;
        self.segments
            .iter_mut()
            .find(|s| s.position() == position)
            .ok_or_else(|| {
                DomainError::NotFound(format!("Segment {} not found in {}", position, source))
            })
    }

    pub fn record_embedding(&mut self, position: usize, vector: &EmbeddingVector) -> DomainResult<()> {
        self.segment_mut(position)?.record_embedding(vector);
        self.dirty = true;
        Ok(())
    }

    pub fn record_failure(&mut self, position: usize, reason: impl Into<String>) -> DomainResult<()> {
        self.segment_mut(position)?.record_failure(reason);
        self.dirty = true;
        Ok(())
    }

    /// Build the index entry for one of this batch's segments
    pub fn entry_for(
        &self,
        segment: &TranscriptSegment,
        vector: EmbeddingVector,
    ) -> DomainResult<VectorIndexEntry> {
        let source_ref = segment
            .source_ref()
            .cloned()
            .unwrap_or_else(|| self.source.clone());

        Ok(VectorIndexEntry::new(
            EntryId::for_segment(&self.source, segment.position()),
            segment.text().trim(),
            source_ref,
            segment.time_range().copied(),
        )?
        .with_vector(vector))
    }
}

impl Entity for TranscriptBatch {
    type Id = SourceRef;

    fn id(&self) -> &Self::Id {
        &self.source
    }
}
