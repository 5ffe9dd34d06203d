/// On-disk record shapes for the index file and transcript batch files
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::entities::VectorIndexEntry;
use crate::domain::base::Entity;

/// Source reference used when a legacy record has none
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One element of the index file's top-level JSON array.
///
/// Aliases accept older index files that used `embedding` for the vector
/// and `url` for the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub text: String,

    #[serde(default, alias = "embedding")]
    pub vector: Vec<f32>,

    #[serde(rename = "sourceRef", alias = "url", default)]
    pub source_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hms: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hms: Option<String>,
}

impl From<&VectorIndexEntry> for IndexEntryRecord {
    fn from(entry: &VectorIndexEntry) -> Self {
        let range = entry.time_range();
        IndexEntryRecord {
            id: Some(entry.id().as_str().to_string()),
            text: entry.text().to_string(),
            vector: entry
                .vector()
                .map(|v| v.dimensions().to_vec())
                .unwrap_or_default(),
            source_ref: Some(entry.source_ref().as_str().to_string()),
            start: range.map(|r| r.start()),
            end: range.map(|r| r.end()),
            start_hms: range.map(|r| r.start_hms()),
            end_hms: range.map(|r| r.end_hms()),
        }
    }
}

/// One element of a transcript batch file.
///
/// Only the embedding cache fields are typed; every other field (`text`,
/// `start`, `end`, `duration`, `url`, ...) is carried through `fields`
/// untouched so a write-back changes nothing else in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
}

impl SegmentRecord {
    pub fn text(&self) -> &str {
        self.fields.get("text").and_then(Value::as_str).unwrap_or("")
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}
