/// The embedding capability consumed by ingestion and search
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::value_objects::EmbeddingVector;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Nothing to embed: text is empty after normalization")]
    EmptyInput,

    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Embedding response contained no usable vector")]
    MissingVector,

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding task did not complete: {0}")]
    Cancelled(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Converts normalized text into a fixed-length vector.
///
/// Implementations hold no state between calls and never retry; retry
/// policy belongs to the caller. Blank input must fail with
/// [`EmbeddingError::EmptyInput`] without reaching the remote service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector>;

    /// Name of the model producing the vectors
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<P> {
    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector> {
        (**self).embed(text).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
