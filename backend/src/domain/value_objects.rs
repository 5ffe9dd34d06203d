/// Value objects for the domain layer
use super::base::{DomainError, DomainResult, ValueObject};
use super::similarity;
use std::fmt;

/// Unique identifier for an index entry, derived from its source and position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidValue("EntryId cannot be empty".to_string()));
        }
        Ok(EntryId(id))
    }

    /// Build the stable id of the segment at `position` within a batch
    pub fn for_segment(batch: &SourceRef, position: usize) -> Self {
        EntryId(format!("{}#{}", batch.as_str(), position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for EntryId {}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to where a fragment came from (file, URL or video id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(source: impl Into<String>) -> DomainResult<Self> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(DomainError::InvalidValue("SourceRef cannot be empty".to_string()));
        }
        Ok(SourceRef(source))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The media part of the reference, without any `#fragment`
    pub fn media_file(&self) -> &str {
        self.0.split('#').next().unwrap_or(&self.0)
    }
}

impl ValueObject for SourceRef {}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset range of a fragment inside time-based media, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> DomainResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DomainError::InvalidValue(
                "Time range bounds must be finite".to_string(),
            ));
        }
        if start < 0.0 {
            return Err(DomainError::InvalidValue(format!(
                "Time range cannot start before zero: {}",
                start
            )));
        }
        if end < start {
            return Err(DomainError::InvalidValue(format!(
                "Time range ends before it starts: {} > {}",
                start, end
            )));
        }
        Ok(TimeRange { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn start_hms(&self) -> String {
        format_hms(self.start)
    }

    pub fn end_hms(&self) -> String {
        format_hms(self.end)
    }
}

impl ValueObject for TimeRange {}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_hms(), self.end_hms())
    }
}

/// Format seconds as `HH:MM:SS`, truncating fractional seconds
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// A dense embedding produced by the embedding model
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector {
    dimensions: Vec<f32>,
}

impl EmbeddingVector {
    /// Create a vector; it must be non-empty and contain only finite values
    pub fn new(dimensions: Vec<f32>) -> DomainResult<Self> {
        if dimensions.is_empty() {
            return Err(DomainError::InvalidValue(
                "Embedding vector cannot be empty".to_string(),
            ));
        }
        if let Some(position) = dimensions.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::InvalidValue(format!(
                "Embedding vector has a non-finite value at position {}",
                position
            )));
        }
        Ok(EmbeddingVector { dimensions })
    }

    pub fn dimensions(&self) -> &[f32] {
        &self.dimensions
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn magnitude(&self) -> f64 {
        similarity::magnitude(&self.dimensions)
    }

    /// Zero vectors carry no direction and can never be ranked
    pub fn is_zero(&self) -> bool {
        self.magnitude() == 0.0
    }

    /// Cosine similarity in [-1, 1], or `None` when it is undefined
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> Option<f32> {
        similarity::cosine_similarity(&self.dimensions, &other.dimensions)
    }
}

impl ValueObject for EmbeddingVector {}

/// Tracks the progress of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionProgress {
    segments_done: usize,
    total_segments: usize,
}

impl IngestionProgress {
    pub fn new(total_segments: usize) -> Self {
        IngestionProgress {
            segments_done: 0,
            total_segments,
        }
    }

    pub fn increment(&mut self) {
        self.segments_done += 1;
    }

    pub fn segments_done(&self) -> usize {
        self.segments_done
    }

    pub fn total_segments(&self) -> usize {
        self.total_segments
    }

    pub fn percentage(&self) -> f64 {
        if self.total_segments == 0 {
            return 100.0;
        }
        (self.segments_done as f64 / self.total_segments as f64) * 100.0
    }
}

impl ValueObject for IngestionProgress {}
