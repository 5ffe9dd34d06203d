use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use transcript_search::application::{
    CommitMode, DescribeIndex, IngestionService, IngestionSummary, SearchRequest, SemanticSearch,
};
use transcript_search::config::{self, AppConfig};
use transcript_search::infrastructure::embeddings::OllamaEmbeddingService;
use transcript_search::infrastructure::file_system::discover_transcript_files;
use transcript_search::infrastructure::persistence::{
    JsonIndexStore, JsonTranscriptStore, MemoryIndexStore,
};

#[derive(Debug, Parser)]
#[command(
    name = "transcript-search",
    about = "Semantic search over timestamped transcripts"
)]
struct Cli {
    /// Base URL of the embedding server
    #[arg(long, global = true, env = config::ENDPOINT_ENV_VAR)]
    endpoint: Option<String>,

    /// Embedding model name
    #[arg(long, global = true, env = config::MODEL_ENV_VAR)]
    model: Option<String>,

    /// Path of the vector index file
    #[arg(long, global = true, env = config::INDEX_PATH_ENV_VAR)]
    index: Option<PathBuf>,

    /// Maximum simultaneous embedding requests
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Embed transcript batch files and commit them to the index
    Index {
        /// Transcript batch files (JSON arrays of segments)
        files: Vec<PathBuf>,
        /// Also index every .json file found under this directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Replace the index with this run's entries instead of merging
        #[arg(long)]
        rebuild: bool,
    },
    /// Find the transcript segments closest in meaning to a query
    Search {
        query: String,
        /// Number of matches to return
        #[arg(long, default_value_t = 1)]
        top_k: usize,
        /// Search only these transcript files, embedded in memory
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Embed index entries that have no vector yet
    Backfill,
    /// Show index statistics
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Invalid configuration in environment")?;

    if let Some(ref endpoint) = cli.endpoint {
        config.embedding_endpoint = endpoint.clone();
    }
    if let Some(ref model) = cli.model {
        config.model_name = model.clone();
    }
    if let Some(ref index) = cli.index {
        config.index_path = index.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency_limit = concurrency;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn summary_json(summary: &IngestionSummary) -> serde_json::Value {
    json!({
        "batches_requested": summary.batches_requested,
        "batches_loaded": summary.batches_loaded,
        "missing_batches": summary.missing_batches,
        "skipped_batches": summary
            .skipped_batches
            .iter()
            .map(|(path, reason)| json!({"path": path, "reason": reason}))
            .collect::<Vec<_>>(),
        "segments_total": summary.segments_total,
        "succeeded": summary.succeeded(),
        "reused": summary.segments_reused,
        "embedded": summary.segments_embedded,
        "failed": summary.failed(),
        "failures": summary
            .failures
            .iter()
            .map(|f| json!({
                "source": f.source.as_str(),
                "position": f.position,
                "error": f.error.to_string(),
            }))
            .collect::<Vec<_>>(),
        "batches_written": summary.batches_written,
        "write_back_failures": summary
            .write_back_failures
            .iter()
            .map(|(source, reason)| json!({"source": source.as_str(), "reason": reason}))
            .collect::<Vec<_>>(),
        "entries_inserted": summary.entries_inserted,
        "entries_updated": summary.entries_updated,
        "index_size": summary.index_size,
        "duration_ms": summary.duration_ms,
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let index_store = JsonIndexStore::new(&config.index_path);

    match cli.command {
        Command::Index {
            mut files,
            dir,
            rebuild,
        } => {
            if let Some(dir) = dir {
                let discovered = discover_transcript_files(&dir)
                    .await
                    .with_context(|| format!("Failed to scan {}", dir.display()))?;
                info!("Found {} transcript files in {}", discovered.len(), dir.display());
                files.extend(discovered);
            }
            if files.is_empty() {
                anyhow::bail!("No transcript files given; pass files or --dir");
            }

            let provider = Arc::new(
                OllamaEmbeddingService::from_config(&config)
                    .context("Failed to create embedding client")?,
            );
            let service = IngestionService::new(provider, index_store, JsonTranscriptStore::new())
                .with_concurrency(config.concurrency_limit);

            let mode = if rebuild {
                CommitMode::Replace
            } else {
                CommitMode::Merge
            };
            let summary = service.ingest(&files, mode).await.context("Ingestion failed")?;
            print_json(&summary_json(&summary))?;
        }
        Command::Search {
            query,
            top_k,
            files,
        } => {
            let provider = Arc::new(
                OllamaEmbeddingService::from_config(&config)
                    .context("Failed to create embedding client")?,
            );
            let request = SearchRequest::new(query).with_top_k(top_k);

            let outcome = if files.is_empty() {
                SemanticSearch::new(provider.as_ref(), &index_store)
                    .execute(request)
                    .await
            } else {
                // The shared index is left untouched
                let service = IngestionService::new(
                    Arc::clone(&provider),
                    MemoryIndexStore::new(),
                    JsonTranscriptStore::new(),
                )
                .with_concurrency(config.concurrency_limit);
                let summary = service
                    .ingest(&files, CommitMode::Replace)
                    .await
                    .context("Failed to embed transcript files")?;
                info!(
                    "Embedded {} of {} segments for an in-memory search",
                    summary.succeeded(),
                    summary.segments_total
                );

                SemanticSearch::new(provider.as_ref(), service.index_repository())
                    .execute(request)
                    .await
            }
            .context("Search failed")?;
            print_json(&outcome)?;
        }
        Command::Backfill => {
            let provider = Arc::new(
                OllamaEmbeddingService::from_config(&config)
                    .context("Failed to create embedding client")?,
            );
            let service = IngestionService::new(provider, index_store, JsonTranscriptStore::new())
                .with_concurrency(config.concurrency_limit);

            let summary = service.backfill().await.context("Backfill failed")?;
            print_json(&json!({
                "pending": summary.pending,
                "filled": summary.filled,
                "failures": summary
                    .failures
                    .iter()
                    .map(|f| json!({"id": f.entry_id.as_str(), "reason": f.reason}))
                    .collect::<Vec<_>>(),
                "duration_ms": summary.duration_ms,
            }))?;
        }
        Command::Stats => {
            let stats = DescribeIndex::new(&index_store)
                .execute()
                .context("Failed to read index")?;
            print_json(&stats)?;
        }
    }

    Ok(())
}
