/// HTTP client for an Ollama-compatible embedding endpoint
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use super::text_preprocessor::TextPreprocessor;
use crate::config::AppConfig;
use crate::domain::value_objects::EmbeddingVector;

/// Longest error body kept in an [`EmbeddingError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Embedding provider that POSTs `{model, prompt}` to `<endpoint>/api/embeddings`
pub struct OllamaEmbeddingService {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// The two response shapes seen from compatible servers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    /// `{"embedding": [..]}`
    TopLevel { embedding: Vec<f32> },
    /// `{"data": [{"embedding": [..]}]}`
    Nested { data: Vec<EmbeddingDatum> },
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_values(self) -> Option<Vec<f32>> {
        let values = match self {
            EmbeddingResponse::TopLevel { embedding } => embedding,
            EmbeddingResponse::Nested { data } => data.into_iter().next()?.embedding,
        };
        (!values.is_empty()).then_some(values)
    }
}

/// Extract the vector from a response body
pub(crate) fn parse_embedding_response(body: &str) -> EmbeddingResult<Vec<f32>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::InvalidResponse(format!("body is not JSON: {}", e)))?;

    serde_json::from_value::<EmbeddingResponse>(value)
        .ok()
        .and_then(EmbeddingResponse::into_values)
        .ok_or(EmbeddingError::MissingVector)
}

impl OllamaEmbeddingService {
    /// Create a client for `endpoint` (e.g. "http://localhost:11434")
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> EmbeddingResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}/api/embeddings", endpoint.trim_end_matches('/'));
        let model = model.into();

        info!("Using embedding model '{}' at {}", model, url);

        Ok(OllamaEmbeddingService { client, url, model })
    }

    pub fn from_config(config: &AppConfig) -> EmbeddingResult<Self> {
        Self::new(
            &config.embedding_endpoint,
            config.model_name.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingService {
    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector> {
        let prompt = TextPreprocessor::instance().normalize(text);
        if prompt.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!("Requesting embedding for text (length: {})", prompt.len());

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: &prompt,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let values = parse_embedding_response(&body)?;
        EmbeddingVector::new(values).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
