use crate::application::dto::{MatchResult, SearchOutcome, SearchRequest};
use crate::application::repositories::{IndexRepository, StoreError};
use crate::domain::similarity::top_k;
use crate::infrastructure::embeddings::{EmbeddingError, EmbeddingProvider, TextPreprocessor};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("No index found at {0}; build one first")]
    IndexUnavailable(String),

    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to load index: {0}")]
    Store(#[from] StoreError),

    #[error("Query vector has {actual} dimensions but the index uses {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Use case for semantic search over the vector index
///
/// Embeds the query once, scans every searchable entry and returns the best
/// matches by cosine similarity. "Nothing matched" is an outcome, not an error.
pub struct SemanticSearch<'a, P: EmbeddingProvider, R: IndexRepository> {
    provider: &'a P,
    repository: &'a R,
}

impl<'a, P: EmbeddingProvider, R: IndexRepository> SemanticSearch<'a, P, R> {
    pub fn new(provider: &'a P, repository: &'a R) -> Self {
        Self {
            provider,
            repository,
        }
    }

    /// Execute a search and return the best matches, best first
    pub async fn execute(&self, request: SearchRequest) -> SearchResult<SearchOutcome> {
        let query = TextPreprocessor::instance().normalize(&request.query);
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        if !self.repository.exists() {
            return Err(SearchError::IndexUnavailable(self.repository.location()));
        }
        let index = self.repository.load()?;

        info!(
            "Searching {} entries for '{}'",
            index.len(),
            TextPreprocessor::instance().preview(&query, 60)
        );

        let query_vector = self.provider.embed(&query).await?;

        if let Some(expected) = index.dimension() {
            if expected != query_vector.dimension_count() {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: query_vector.dimension_count(),
                });
            }
        }

        let matches: Vec<MatchResult> = top_k(&query_vector, index.searchable_entries(), request.top_k)
            .into_iter()
            .map(MatchResult::from)
            .collect();

        match matches.first() {
            Some(best) => {
                debug!("Best match {} with score {:.4}", best.entry_id, best.score);
                Ok(SearchOutcome::Found(matches))
            }
            None => {
                debug!("No searchable entries matched");
                Ok(SearchOutcome::NoMatch)
            }
        }
    }
}
