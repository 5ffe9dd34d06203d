/// Ingestion service for embedding transcript batches into the vector index
use crate::application::repositories::{IndexRepository, StoreError, TranscriptRepository};
use crate::domain::aggregates::VectorIndex;
use crate::domain::base::{DomainError, Entity};
use crate::domain::value_objects::{EmbeddingVector, EntryId, IngestionProgress, SourceRef};
use crate::infrastructure::embeddings::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default bound on simultaneous embedding requests
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Index error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to persist index: {source}")]
    Persistence {
        #[source]
        source: StoreError,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

pub type IngestionResult<T> = Result<T, IngestionError>;

/// Callback type for progress events
pub type ProgressCallback = Arc<dyn Fn(IngestionProgressEvent) + Send + Sync>;

/// Progress event for an ingestion run
#[derive(Debug, Clone)]
pub enum IngestionProgressEvent {
    Started { total_batches: usize },
    BatchLoaded { source: SourceRef, segments: usize },
    BatchMissing { locator: PathBuf },
    SegmentProcessed { progress: IngestionProgress },
    SegmentFailed { source: SourceRef, position: usize, reason: String },
    Committed { entries: usize, index_size: usize, duration_ms: u64 },
}

/// How freshly embedded entries are combined with the persisted index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Upsert by entry id into the existing index
    #[default]
    Merge,
    /// The committed index holds exactly this run's entries
    Replace,
}

/// A segment that could not be embedded
#[derive(Debug)]
pub struct SegmentFailure {
    pub source: SourceRef,
    pub position: usize,
    pub error: EmbeddingError,
}

/// Summary of an ingestion run
#[derive(Debug, Default)]
pub struct IngestionSummary {
    pub batches_requested: usize,
    pub batches_loaded: usize,
    pub missing_batches: Vec<PathBuf>,
    /// Batches that exist but could not be read or parsed
    pub skipped_batches: Vec<(PathBuf, String)>,
    pub segments_total: usize,
    /// Segments whose cached vector was reused without a remote call
    pub segments_reused: usize,
    pub segments_embedded: usize,
    pub failures: Vec<SegmentFailure>,
    pub batches_written: usize,
    pub write_back_failures: Vec<(SourceRef, String)>,
    pub entries_inserted: usize,
    pub entries_updated: usize,
    pub index_size: usize,
    pub duration_ms: u64,
}

impl IngestionSummary {
    pub fn succeeded(&self) -> usize {
        self.segments_reused + self.segments_embedded
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.segments_total == 0 {
            return 100.0;
        }
        (self.succeeded() as f64 / self.segments_total as f64) * 100.0
    }

    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
            || !self.skipped_batches.is_empty()
            || !self.write_back_failures.is_empty()
    }
}

/// A pending index entry that backfill could not fill
#[derive(Debug)]
pub struct EntryFailure {
    pub entry_id: EntryId,
    pub reason: String,
}

/// Summary of a backfill run
#[derive(Debug, Default)]
pub struct BackfillSummary {
    pub pending: usize,
    pub filled: usize,
    pub failures: Vec<EntryFailure>,
    pub duration_ms: u64,
}

/// A zero vector has no direction, so it can never be ranked or reused
fn zero_vector_error() -> EmbeddingError {
    EmbeddingError::InvalidResponse("embedding is a zero vector".to_string())
}

/// Service that turns transcript batches into committed index entries.
///
/// Every embedding request made through one service, across all concurrent
/// `ingest` and `backfill` calls, shares a single concurrency bound. Index
/// commits are serialized and always reload the persisted index first.
pub struct IngestionService<P, I, T>
where
    P: EmbeddingProvider + 'static,
    I: IndexRepository,
    T: TranscriptRepository,
{
    provider: Arc<P>,
    index_repository: I,
    transcript_repository: T,
    semaphore: Arc<Semaphore>,
    concurrency_limit: usize,
    commit_lock: Mutex<()>,
    progress_callback: Option<ProgressCallback>,
}

impl<P, I, T> IngestionService<P, I, T>
where
    P: EmbeddingProvider + 'static,
    I: IndexRepository,
    T: TranscriptRepository,
{
    /// The concurrency bound and commit lock live on the service, not on the
    /// provider or the store. Share one service per index: two services
    /// writing the same index path are neither bounded nor serialized together.
    pub fn new(provider: Arc<P>, index_repository: I, transcript_repository: T) -> Self {
        IngestionService {
            provider,
            index_repository,
            transcript_repository,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            concurrency_limit: DEFAULT_CONCURRENCY,
            commit_lock: Mutex::new(()),
            progress_callback: None,
        }
    }

    /// Bound simultaneous embedding requests; values below 1 are raised to 1
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        let limit = max_concurrent.max(1);
        self.semaphore = Arc::new(Semaphore::new(limit));
        self.concurrency_limit = limit;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn index_repository(&self) -> &I {
        &self.index_repository
    }

    fn emit(&self, event: IngestionProgressEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }

    /// Embed and commit the transcript batches stored at `locators`
    pub async fn ingest(
        &self,
        locators: &[PathBuf],
        mode: CommitMode,
    ) -> IngestionResult<IngestionSummary> {
        let start_time = Instant::now();
        let mut summary = IngestionSummary {
            batches_requested: locators.len(),
            ..Default::default()
        };

        self.emit(IngestionProgressEvent::Started {
            total_batches: locators.len(),
        });

        let mut batches = Vec::with_capacity(locators.len());
        for locator in locators {
            match self.transcript_repository.load(locator) {
                Ok(Some(batch)) => {
                    info!(
                        "Loaded {} segments from {}",
                        batch.segments().len(),
                        batch.source()
                    );
                    self.emit(IngestionProgressEvent::BatchLoaded {
                        source: batch.source().clone(),
                        segments: batch.segments().len(),
                    });
                    batches.push(batch);
                }
                Ok(None) => {
                    warn!("Transcript batch {} not found, skipping", locator.display());
                    self.emit(IngestionProgressEvent::BatchMissing {
                        locator: locator.clone(),
                    });
                    summary.missing_batches.push(locator.clone());
                }
                Err(e) => {
                    warn!("Skipping transcript batch {}: {}", locator.display(), e);
                    summary.skipped_batches.push((locator.clone(), e.to_string()));
                }
            }
        }
        summary.batches_loaded = batches.len();

        // A merge must match the persisted index; otherwise the first cached
        // vector decides, and failing that the first fresh one.
        let mut dimension = match mode {
            CommitMode::Merge => self.index_repository.load()?.dimension(),
            CommitMode::Replace => None,
        };
        if dimension.is_none() {
            dimension = batches
                .iter()
                .flat_map(|batch| batch.text_segments())
                .find_map(|segment| segment.usable_embedding(None))
                .map(|vector| vector.dimension_count());
        }

        let mut accepted: Vec<HashMap<usize, EmbeddingVector>> = vec![HashMap::new(); batches.len()];
        let mut jobs = Vec::new();
        let mut texts = Vec::new();
        for (batch_idx, batch) in batches.iter().enumerate() {
            for segment in batch.text_segments() {
                summary.segments_total += 1;
                match segment.usable_embedding(dimension) {
                    Some(vector) => {
                        accepted[batch_idx].insert(segment.position(), vector);
                        summary.segments_reused += 1;
                    }
                    None => {
                        jobs.push((batch_idx, segment.position()));
                        texts.push(segment.text().to_string());
                    }
                }
            }
        }

        debug!(
            "{} segments to embed, {} reused from cache",
            jobs.len(),
            summary.segments_reused
        );

        let results = self.embed_all(texts).await;

        for ((batch_idx, position), result) in jobs.into_iter().zip(results) {
            let batch = &mut batches[batch_idx];
            let outcome = result.and_then(|vector| match dimension {
                _ if vector.is_zero() => Err(zero_vector_error()),
                Some(expected) if expected != vector.dimension_count() => {
                    Err(EmbeddingError::DimensionMismatch {
                        expected,
                        actual: vector.dimension_count(),
                    })
                }
                _ => Ok(vector),
            });

            match outcome {
                Ok(vector) => {
                    dimension.get_or_insert(vector.dimension_count());
                    batch.record_embedding(position, &vector)?;
                    accepted[batch_idx].insert(position, vector);
                    summary.segments_embedded += 1;
                }
                Err(error) => {
                    warn!(
                        "Failed to embed segment {} of {}: {}",
                        position,
                        batch.source(),
                        error
                    );
                    batch.record_failure(position, error.to_string())?;
                    self.emit(IngestionProgressEvent::SegmentFailed {
                        source: batch.source().clone(),
                        position,
                        reason: error.to_string(),
                    });
                    summary.failures.push(SegmentFailure {
                        source: batch.source().clone(),
                        position,
                        error,
                    });
                }
            }
        }

        // Write fresh vectors and failure notes back to each batch's own file
        for batch in batches.iter_mut().filter(|batch| batch.is_dirty()) {
            match self.transcript_repository.save(batch) {
                Ok(()) => {
                    debug!("Wrote embeddings back to {}", batch.source());
                    batch.mark_clean();
                    summary.batches_written += 1;
                }
                Err(e) => {
                    error!("Failed to write embeddings back to {}: {}", batch.source(), e);
                    summary
                        .write_back_failures
                        .push((batch.source().clone(), e.to_string()));
                }
            }
        }

        let mut entries = Vec::new();
        for (batch, mut vectors) in batches.iter().zip(accepted) {
            for segment in batch.text_segments() {
                if let Some(vector) = vectors.remove(&segment.position()) {
                    entries.push(batch.entry_for(segment, vector)?);
                }
            }
        }
        let committed = entries.len();

        let index_size = {
            let _guard = self.commit_lock.lock().await;
            let mut index = match mode {
                CommitMode::Merge => self.index_repository.load()?,
                CommitMode::Replace => VectorIndex::new(),
            };
            let stats = index.merge(entries)?;
            summary.entries_inserted = stats.inserted;
            summary.entries_updated = stats.updated;

            self.index_repository
                .save(&index)
                .map_err(|source| IngestionError::Persistence { source })?;
            index.len()
        };

        summary.index_size = index_size;
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Committed {} entries to {} ({} total, {} failed, {} reused)",
            committed,
            self.index_repository.location(),
            index_size,
            summary.failed(),
            summary.segments_reused
        );
        self.emit(IngestionProgressEvent::Committed {
            entries: committed,
            index_size,
            duration_ms: summary.duration_ms,
        });

        Ok(summary)
    }

    /// Embed every index entry that has no vector yet
    pub async fn backfill(&self) -> IngestionResult<BackfillSummary> {
        let start_time = Instant::now();

        let pending: Vec<(EntryId, String)> = self
            .index_repository
            .load()?
            .pending_entries()
            .map(|entry| (entry.id().clone(), entry.text().to_string()))
            .collect();

        let mut summary = BackfillSummary {
            pending: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            info!("No pending entries in {}", self.index_repository.location());
            summary.duration_ms = start_time.elapsed().as_millis() as u64;
            return Ok(summary);
        }

        info!("Backfilling {} pending entries", pending.len());
        let (ids, texts): (Vec<EntryId>, Vec<String>) = pending.into_iter().unzip();
        let results = self.embed_all(texts).await;

        let _guard = self.commit_lock.lock().await;
        let mut index = self.index_repository.load()?;

        for (entry_id, result) in ids.into_iter().zip(results) {
            // update_vector enforces the dimensionality of vectors already present
            let outcome = result
                .and_then(|vector| {
                    if vector.is_zero() {
                        Err(zero_vector_error())
                    } else {
                        Ok(vector)
                    }
                })
                .map_err(|e| e.to_string())
                .and_then(|vector| index.update_vector(&entry_id, vector).map_err(|e| e.to_string()));

            match outcome {
                Ok(()) => summary.filled += 1,
                Err(reason) => {
                    warn!("Failed to backfill {}: {}", entry_id, reason);
                    summary.failures.push(EntryFailure { entry_id, reason });
                }
            }
        }

        if summary.filled > 0 {
            self.index_repository
                .save(&index)
                .map_err(|source| IngestionError::Persistence { source })?;
        }

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Backfilled {} of {} pending entries",
            summary.filled, summary.pending
        );
        Ok(summary)
    }

    /// Embed `texts` under the shared bound; results keep the input order
    async fn embed_all(&self, texts: Vec<String>) -> Vec<EmbeddingResult<EmbeddingVector>> {
        let total = texts.len();
        let mut progress = IngestionProgress::new(total);
        let mut results: Vec<Option<EmbeddingResult<EmbeddingVector>>> =
            (0..total).map(|_| None).collect();

        // Dropping the set aborts tasks still queued on the semaphore
        let mut tasks = JoinSet::new();
        for (job, text) in texts.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let provider = Arc::clone(&self.provider);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => provider.embed(&text).await,
                    Err(_) => Err(EmbeddingError::Cancelled(
                        "concurrency limiter closed".to_string(),
                    )),
                };
                (job, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job, result)) => {
                    results[job] = Some(result);
                    progress.increment();
                    self.emit(IngestionProgressEvent::SegmentProcessed {
                        progress: progress.clone(),
                    });
                }
                Err(e) => error!("Embedding task did not complete: {}", e),
            }
        }

        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| {
                    Err(EmbeddingError::Cancelled(
                        "embedding task did not complete".to_string(),
                    ))
                })
            })
            .collect()
    }
}
