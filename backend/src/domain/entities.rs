/// Domain entities
use super::base::{DomainError, DomainResult, Entity};
use super::value_objects::{EmbeddingVector, EntryId, SourceRef, TimeRange};

/// A searchable fragment of text with its embedding.
///
/// An entry without a vector (or with a zero vector) is "pending embedding":
/// it stays in the index but is never a search candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndexEntry {
    id: EntryId,
    vector: Option<EmbeddingVector>,
    text: String,
    source_ref: SourceRef,
    time_range: Option<TimeRange>,
}

impl VectorIndexEntry {
    /// Create a pending entry; `text` must not be blank
    pub fn new(
        id: EntryId,
        text: impl Into<String>,
        source_ref: SourceRef,
        time_range: Option<TimeRange>,
    ) -> DomainResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::InvalidValue(format!(
                "Entry {} has no text",
                id
            )));
        }
        Ok(VectorIndexEntry {
            id,
            vector: None,
            text,
            source_ref,
            time_range,
        })
    }

    pub fn with_vector(mut self, vector: EmbeddingVector) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn vector(&self) -> Option<&EmbeddingVector> {
        self.vector.as_ref()
    }

    /// The vector, if it can take part in ranking
    pub fn searchable_vector(&self) -> Option<&EmbeddingVector> {
        self.vector.as_ref().filter(|v| !v.is_zero())
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable_vector().is_some()
    }

    pub fn is_pending(&self) -> bool {
        !self.is_searchable()
    }

    pub fn set_vector(&mut self, vector: EmbeddingVector) {
        self.vector = Some(vector);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.source_ref
    }

    pub fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }
}

impl Entity for VectorIndexEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One timestamped fragment of a transcript batch
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    position: usize,
    text: String,
    time_range: Option<TimeRange>,
    source_ref: Option<SourceRef>,
    embedding: Option<Vec<f32>>,
    embedding_error: Option<String>,
    /// The stored record as read, written back verbatim apart from the cache fields
    extra_fields: serde_json::Map<String, serde_json::Value>,
}

impl TranscriptSegment {
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        TranscriptSegment {
            position,
            text: text.into(),
            time_range: None,
            source_ref: None,
            embedding: None,
            embedding_error: None,
            extra_fields: serde_json::Map::new(),
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    pub fn with_source_ref(mut self, source_ref: SourceRef) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    /// Attach a cached embedding exactly as it was stored, usable or not
    pub fn with_cached_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_embedding_error(mut self, error: impl Into<String>) -> Self {
        self.embedding_error = Some(error.into());
        self
    }

    pub fn with_extra_fields(mut self, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra_fields = fields;
        self
    }

    /// Index of the segment inside its batch, counting empty segments
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }

    pub fn source_ref(&self) -> Option<&SourceRef> {
        self.source_ref.as_ref()
    }

    pub fn cached_embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn embedding_error(&self) -> Option<&str> {
        self.embedding_error.as_deref()
    }

    pub fn extra_fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra_fields
    }

    /// The cached embedding if it is non-empty, finite, non-zero and, when
    /// a dimensionality is known, of that length
    pub fn usable_embedding(&self, dimension: Option<usize>) -> Option<EmbeddingVector> {
        let raw = self.embedding.as_ref()?;
        if let Some(expected) = dimension {
            if raw.len() != expected {
                return None;
            }
        }
        EmbeddingVector::new(raw.clone())
            .ok()
            .filter(|vector| !vector.is_zero())
    }

    /// Store a freshly computed embedding and clear any earlier failure
    pub fn record_embedding(&mut self, vector: &EmbeddingVector) {
        self.embedding = Some(vector.dimensions().to_vec());
        self.embedding_error = None;
    }

    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.embedding_error = Some(reason.into());
    }
}
