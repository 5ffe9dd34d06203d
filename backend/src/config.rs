/// Explicit configuration passed to the index store and embedding provider
use std::path::PathBuf;
use thiserror::Error;

pub const ENDPOINT_ENV_VAR: &str = "OLLAMA_URL";
pub const MODEL_ENV_VAR: &str = "EMBED_MODEL";
pub const INDEX_PATH_ENV_VAR: &str = "INDEX_PATH";
pub const CONCURRENCY_ENV_VAR: &str = "EMBED_CONCURRENCY";
pub const TIMEOUT_ENV_VAR: &str = "EMBED_TIMEOUT_SECS";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("Concurrency limit must be at least 1")]
    ZeroConcurrency,

    #[error("{0} must not be empty")]
    Empty(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for embedding, indexing and search
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the embedding server
    pub embedding_endpoint: String,
    /// Embedding model requested from the server
    pub model_name: String,
    /// Location of the persisted vector index
    pub index_path: PathBuf,
    /// Maximum simultaneous outstanding embedding requests
    pub concurrency_limit: usize,
    /// Per-request timeout for embedding calls
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            embedding_endpoint: "http://localhost:11434".to_string(),
            model_name: "nomic-embed-text".to_string(),
            index_path: PathBuf::from("index.json"),
            concurrency_limit: 4,
            request_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values returned by `lookup`
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(endpoint) = lookup(ENDPOINT_ENV_VAR) {
            config.embedding_endpoint = endpoint;
        }
        if let Some(model) = lookup(MODEL_ENV_VAR) {
            config.model_name = model;
        }
        if let Some(path) = lookup(INDEX_PATH_ENV_VAR) {
            config.index_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(CONCURRENCY_ENV_VAR) {
            config.concurrency_limit = parse_number(CONCURRENCY_ENV_VAR, &value)?;
        }
        if let Some(value) = lookup(TIMEOUT_ENV_VAR) {
            config.request_timeout_secs = parse_number(TIMEOUT_ENV_VAR, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.embedding_endpoint.trim().is_empty() {
            return Err(ConfigError::Empty(ENDPOINT_ENV_VAR.to_string()));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::Empty(MODEL_ENV_VAR.to_string()));
        }
        if self.index_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty(INDEX_PATH_ENV_VAR.to_string()));
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}
