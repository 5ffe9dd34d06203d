/// Transcript batch parser - converts transcript JSON into TranscriptBatch domain objects
use crate::domain::aggregates::TranscriptBatch;
use crate::domain::base::DomainError;
use crate::domain::entities::TranscriptSegment;
use crate::domain::value_objects::{SourceRef, TimeRange};
use crate::infrastructure::persistence::SegmentRecord;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid transcript JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid segment at position {position}: {source}")]
    Segment {
        position: usize,
        #[source]
        source: DomainError,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser for transcript batch files.
///
/// A batch file is a JSON array of segment objects. Both the exported
/// shape `{text, start, end, start_hms, end_hms, url}` and the raw
/// speech-recognition shape `{text, start, duration}` are accepted.
pub struct TranscriptJsonParser;

impl TranscriptJsonParser {
    /// Parse batch file content; `source` identifies the batch
    pub fn parse_content(content: &str, source: SourceRef) -> ParseResult<TranscriptBatch> {
        let records: Vec<SegmentRecord> = serde_json::from_str(content)?;

        let segments = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| Self::parse_segment(position, record))
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(TranscriptBatch::new(source, segments))
    }

    fn parse_segment(position: usize, record: SegmentRecord) -> ParseResult<TranscriptSegment> {
        let invalid = |source: DomainError| ParseError::Segment { position, source };

        let mut segment = TranscriptSegment::new(position, record.text());

        if let Some(start) = record.number("start") {
            let end = record
                .number("end")
                .or_else(|| record.number("duration").map(|d| start + d.max(0.0)))
                .unwrap_or(start);
            // A bad timestamp costs the segment its range, never the batch
            match TimeRange::new(start, end.max(start)) {
                Ok(range) => segment = segment.with_time_range(range),
                Err(e) => warn!("Ignoring time range of segment {}: {}", position, e),
            }
        }

        // An empty url is treated as absent
        if let Some(url) = record.string("url").filter(|u| !u.trim().is_empty()) {
            segment = segment.with_source_ref(SourceRef::new(url).map_err(invalid)?);
        }

        if let Some(embedding) = record.embedding {
            segment = segment.with_cached_embedding(embedding);
        }
        if let Some(error) = record.embedding_error {
            segment = segment.with_embedding_error(error);
        }

        Ok(segment.with_extra_fields(record.fields))
    }

    /// Render a batch back to pretty-printed JSON
    pub fn render(batch: &TranscriptBatch) -> ParseResult<String> {
        let records: Vec<SegmentRecord> = batch
            .segments()
            .iter()
            .map(|segment| SegmentRecord {
                fields: segment.extra_fields().clone(),
                embedding: segment.cached_embedding().map(<[f32]>::to_vec),
                embedding_error: segment.embedding_error().map(str::to_string),
            })
            .collect();

        Ok(serde_json::to_string_pretty(&records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EmbeddingVector;

    fn source() -> SourceRef {
        SourceRef::new("output/json/talk_transcript.json").unwrap()
    }

    #[test]
    fn test_parse_exported_segments() {
        let content = r#"[
            {"text": "Hello and welcome", "start": 0, "end": 2.5, "start_hms": "00:00:00",
             "end_hms": "00:00:02", "url": "talk.mp4#t=0", "source": "asr"},
            {"text": "Today we talk about Rust", "start": 2.5, "end": 6.0, "url": "talk.mp4#t=2"}
        ]"#;

        let batch = TranscriptJsonParser::parse_content(content, source()).unwrap();
        assert_eq!(batch.segments().len(), 2);

        let first = &batch.segments()[0];
        assert_eq!(first.position(), 0);
        assert_eq!(first.text(), "Hello and welcome");
        assert_eq!(first.time_range().unwrap().end(), 2.5);
        assert_eq!(first.source_ref().unwrap().as_str(), "talk.mp4#t=0");
        assert!(first.cached_embedding().is_none());
    }

    #[test]
    fn test_parse_raw_asr_shape() {
        let content = r#"[{"text": "raw output", "start": 10.0, "duration": 4.5}]"#;
        let batch = TranscriptJsonParser::parse_content(content, source()).unwrap();

        let range = batch.segments()[0].time_range().unwrap();
        assert_eq!(range.start(), 10.0);
        assert_eq!(range.end(), 14.5);
        assert!(batch.segments()[0].source_ref().is_none());
    }

    #[test]
    fn test_parse_keeps_blank_segments_for_positions() {
        let content = r#"[{"text": ""}, {"start": 1}, {"text": "real", "start": 2}]"#;
        let batch = TranscriptJsonParser::parse_content(content, source()).unwrap();

        assert_eq!(batch.segments().len(), 3);
        let text_positions: Vec<usize> = batch.text_segments().map(|s| s.position()).collect();
        assert_eq!(text_positions, vec![2]);
    }

    #[test]
    fn test_parse_cached_embedding_and_error() {
        let content = r#"[
            {"text": "a", "embedding": [0.5, 0.5]},
            {"text": "b", "embedding": [], "embedding_error": "HTTP 500"}
        ]"#;
        let batch = TranscriptJsonParser::parse_content(content, source()).unwrap();

        assert!(batch.segments()[0].usable_embedding(Some(2)).is_some());
        assert!(batch.segments()[1].usable_embedding(None).is_none());
        assert_eq!(batch.segments()[1].embedding_error(), Some("HTTP 500"));
    }

    #[test]
    fn test_parse_rejects_invalid_json_and_ranges() {
        assert!(matches!(
            TranscriptJsonParser::parse_content("{not json", source()),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            TranscriptJsonParser::parse_content(r#"{"text": "not an array"}"#, source()),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_parse_tolerates_odd_timestamps() {
        let content = r#"[
            {"text": "one", "start": 0, "end": 2},
            {"text": "two", "start": 5, "end": 4.99},
            {"text": "three", "start": -1, "end": 8}
        ]"#;
        let batch = TranscriptJsonParser::parse_content(content, source()).unwrap();
        assert_eq!(batch.segments().len(), 3);

        let clamped = batch.segments()[1].time_range().unwrap();
        assert_eq!((clamped.start(), clamped.end()), (5.0, 5.0));
        assert!(batch.segments()[2].time_range().is_none());
        assert_eq!(batch.segments()[2].text(), "three");
    }

    #[test]
    fn test_render_adds_embedding_and_keeps_other_fields() {
        let content = r#"[{"text":"hello","start":1,"duration":2,"source":"asr"}]"#;
        let mut batch = TranscriptJsonParser::parse_content(content, source()).unwrap();
        batch
            .record_embedding(0, &EmbeddingVector::new(vec![0.25, 0.75]).unwrap())
            .unwrap();

        let rendered = TranscriptJsonParser::render(&batch).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let record = &value[0];

        assert_eq!(record["text"], "hello");
        assert_eq!(record["start"], 1);
        assert_eq!(record["duration"], 2);
        assert_eq!(record["source"], "asr");
        assert_eq!(record["embedding"], serde_json::json!([0.25, 0.75]));
        assert!(record.get("embedding_error").is_none());
        assert!(record.get("end").is_none());
    }

    #[test]
    fn test_render_then_parse_preserves_segments() {
        let content = r#"[{"text":"one","start":0,"end":1,"url":"a.mp4#t=0"},{"text":"two","start":1,"end":2}]"#;
        let mut batch = TranscriptJsonParser::parse_content(content, source()).unwrap();
        batch.record_failure(1, "HTTP 503").unwrap();

        let rendered = TranscriptJsonParser::render(&batch).unwrap();
        let reparsed = TranscriptJsonParser::parse_content(&rendered, source()).unwrap();

        assert_eq!(reparsed.segments(), batch.segments());
    }
}
