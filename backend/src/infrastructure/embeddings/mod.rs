/// Embeddings infrastructure for semantic search
mod ollama_service;
mod provider;
mod text_preprocessor;

pub use ollama_service::OllamaEmbeddingService;
pub use provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
pub use text_preprocessor::TextPreprocessor;
