use crate::domain::base::Entity;
use crate::domain::similarity::ScoredEntry;
use serde::Serialize;

/// Default number of matches returned by a search
pub const DEFAULT_TOP_K: usize = 1;

/// Search request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// The raw search query text
    pub query: String,
    /// Maximum number of matches to return, best first
    pub top_k: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

/// A matched transcript fragment with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub entry_id: String,
    /// Deep link into the media, e.g. `talk.mp4#t=12`
    pub source_ref: String,
    /// The media file part of `source_ref`
    pub media_file: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_hms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_hms: Option<String>,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

impl From<ScoredEntry<'_>> for MatchResult {
    fn from(scored: ScoredEntry<'_>) -> Self {
        let entry = scored.entry;
        let range = entry.time_range();
        MatchResult {
            entry_id: entry.id().as_str().to_string(),
            source_ref: entry.source_ref().as_str().to_string(),
            media_file: entry.source_ref().media_file().to_string(),
            text: entry.text().to_string(),
            start: range.map(|r| r.start()),
            end: range.map(|r| r.end()),
            start_hms: range.map(|r| r.start_hms()),
            end_hms: range.map(|r| r.end_hms()),
            score: scored.score,
        }
    }
}

/// Result of a valid search: matches, or an explicit "nothing matched"
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "matches", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(Vec<MatchResult>),
    NoMatch,
}

impl SearchOutcome {
    /// The highest-scoring match, if any
    pub fn best(&self) -> Option<&MatchResult> {
        match self {
            SearchOutcome::Found(matches) => matches.first(),
            SearchOutcome::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}
