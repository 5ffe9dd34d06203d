/// Integration tests for transcript ingestion against JSON storage
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use transcript_search::application::repositories::{
    IndexRepository, StoreError, StoreResult, TranscriptRepository,
};
use transcript_search::application::services::{CommitMode, IngestionError, IngestionService};
use transcript_search::domain::aggregates::TranscriptBatch;
use transcript_search::domain::base::Entity;
use transcript_search::domain::value_objects::EmbeddingVector;
use transcript_search::infrastructure::embeddings::{
    EmbeddingError, EmbeddingProvider, EmbeddingResult,
};
use transcript_search::infrastructure::persistence::{JsonIndexStore, JsonTranscriptStore};

/// Deterministic provider that counts calls and tracks in-flight requests
struct ScriptedProvider {
    failing: Mutex<HashSet<String>>,
    silent: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    fn new() -> Self {
        ScriptedProvider {
            failing: Mutex::new(HashSet::new()),
            silent: HashSet::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fail_on(self, text: &str) -> Self {
        self.failing.lock().unwrap().insert(text.to_string());
        self
    }

    /// Answer `text` with an all-zero vector
    fn zero_on(mut self, text: &str) -> Self {
        self.silent.insert(text.to_string());
        self
    }

    fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(text: &str) -> Vec<f32> {
        let e_count = text.matches('e').count() as f32;
        vec![text.len() as f32, e_count + 1.0, 1.0]
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(text) {
            return Err(EmbeddingError::Status {
                status: 500,
                body: "model unavailable".to_string(),
            });
        }
        if self.silent.contains(text) {
            return Ok(EmbeddingVector::new(vec![0.0; 3]).unwrap());
        }
        Ok(EmbeddingVector::new(Self::vector_for(text)).unwrap())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

type TestService = IngestionService<ScriptedProvider, JsonIndexStore, JsonTranscriptStore>;

fn service(provider: &Arc<ScriptedProvider>, index_path: &Path) -> TestService {
    IngestionService::new(
        Arc::clone(provider),
        JsonIndexStore::new(index_path),
        JsonTranscriptStore::new(),
    )
}

/// Reads batches from disk but refuses every write-back
struct ReadOnlyTranscripts(JsonTranscriptStore);

impl TranscriptRepository for ReadOnlyTranscripts {
    fn load(&self, locator: &Path) -> StoreResult<Option<TranscriptBatch>> {
        self.0.load(locator)
    }

    fn save(&self, batch: &TranscriptBatch) -> StoreResult<()> {
        Err(StoreError::Persistence {
            path: PathBuf::from(batch.source().as_str()),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only share"),
        })
    }
}

fn write_batch(dir: &Path, name: &str, texts: &[&str]) -> PathBuf {
    let segments: Vec<serde_json::Value> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::json!({
                "text": text,
                "start": i as f64 * 2.0,
                "end": i as f64 * 2.0 + 2.0,
                "url": format!("{}.mp4#t={}", name, i * 2),
            })
        })
        .collect();
    let path = dir.join(format!("{}.json", name));
    std::fs::write(&path, serde_json::to_string_pretty(&segments).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_segments() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = write_batch(temp_dir.path(), "talk", &["first part", "second part", "third part"]);

    let provider = Arc::new(ScriptedProvider::new().fail_on("second part"));
    let summary = service(&provider, &index_path)
        .ingest(&[batch.clone()], CommitMode::Merge)
        .await
        .unwrap();

    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].position, 1);
    assert!(matches!(
        summary.failures[0].error,
        EmbeddingError::Status { status: 500, .. }
    ));

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(index.len(), 2);
    let texts: Vec<&str> = index.entries().map(|e| e.text()).collect();
    assert_eq!(texts, vec!["first part", "third part"]);

    // The batch file caches fresh vectors and notes the failure
    let written = read_json(&batch);
    assert_eq!(written[0]["embedding"].as_array().unwrap().len(), 3);
    assert!(written[1].get("embedding").is_none());
    assert!(written[1]["embedding_error"]
        .as_str()
        .unwrap()
        .contains("500"));
    assert_eq!(written[2]["url"], "talk.mp4#t=4");
}

#[tokio::test]
async fn test_rerun_reuses_cached_vectors() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = write_batch(temp_dir.path(), "talk", &["alpha", "beta", "gamma"]);

    let provider = Arc::new(ScriptedProvider::new());
    let service = service(&provider, &index_path);

    service.ingest(&[batch.clone()], CommitMode::Merge).await.unwrap();
    assert_eq!(provider.calls(), 3);
    let first = JsonIndexStore::new(&index_path).load().unwrap();

    let summary = service.ingest(&[batch], CommitMode::Merge).await.unwrap();
    assert_eq!(provider.calls(), 3, "no remote calls for cached segments");
    assert_eq!(summary.segments_reused, 3);
    assert_eq!(summary.entries_updated, 3);
    assert_eq!(summary.batches_written, 0);

    let second = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rerun_retries_only_failed_segments() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = write_batch(temp_dir.path(), "talk", &["one", "two", "three"]);

    let provider = Arc::new(ScriptedProvider::new().fail_on("two"));
    let service = service(&provider, &index_path);

    service.ingest(&[batch.clone()], CommitMode::Merge).await.unwrap();
    assert_eq!(provider.calls(), 3);

    provider.recover();
    let summary = service.ingest(&[batch.clone()], CommitMode::Merge).await.unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(summary.segments_embedded, 1);
    assert_eq!(summary.entries_inserted, 1);
    assert_eq!(summary.index_size, 3);
    assert!(read_json(&batch)[1].get("embedding_error").is_none());
}

#[tokio::test]
async fn test_missing_and_corrupt_batches_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let good = write_batch(temp_dir.path(), "good", &["kept segment"]);
    let missing = temp_dir.path().join("missing.json");
    let corrupt = temp_dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "[{\"text\": ").unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    let summary = service(&provider, &index_path)
        .ingest(&[missing.clone(), corrupt.clone(), good], CommitMode::Merge)
        .await
        .unwrap();

    assert_eq!(summary.batches_requested, 3);
    assert_eq!(summary.batches_loaded, 1);
    assert_eq!(summary.missing_batches, vec![missing]);
    assert_eq!(summary.skipped_batches.len(), 1);
    assert_eq!(summary.skipped_batches[0].0, corrupt);
    assert_eq!(summary.index_size, 1);
}

#[tokio::test]
async fn test_concurrent_ingests_respect_limit_and_keep_all_entries() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batches: Vec<PathBuf> = (0..4)
        .map(|n| {
            let texts: Vec<String> = (0..6).map(|i| format!("batch {} segment {}", n, i)).collect();
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            write_batch(temp_dir.path(), &format!("talk{}", n), &refs)
        })
        .collect();

    let provider = Arc::new(ScriptedProvider::new().with_delay(Duration::from_millis(10)));
    let service = Arc::new(service(&provider, &index_path).with_concurrency(2));

    let (a, b, c, d) = tokio::join!(
        service.ingest(&batches[0..1], CommitMode::Merge),
        service.ingest(&batches[1..2], CommitMode::Merge),
        service.ingest(&batches[2..3], CommitMode::Merge),
        service.ingest(&batches[3..4], CommitMode::Merge),
    );
    for result in [a, b, c, d] {
        assert_eq!(result.unwrap().segments_embedded, 6);
    }

    assert_eq!(provider.calls(), 24);
    let peak = provider.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak in-flight requests {} exceeded limit", peak);
    assert!(peak >= 1);

    // Merge-then-save loses no concurrent commit
    let index = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(index.len(), 24);
}

#[tokio::test]
async fn test_index_persistence_failure_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "a file, not a directory").unwrap();
    let batch = write_batch(temp_dir.path(), "talk", &["some words"]);

    let provider = Arc::new(ScriptedProvider::new());
    let result = service(&provider, &blocker.join("index.json"))
        .ingest(&[batch], CommitMode::Merge)
        .await;

    assert!(matches!(result, Err(IngestionError::Persistence { .. })));
}

#[tokio::test]
async fn test_replace_mode_rebuilds_index() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let first = write_batch(temp_dir.path(), "first", &["old content", "more old content"]);
    let second = write_batch(temp_dir.path(), "second", &["new content"]);

    let provider = Arc::new(ScriptedProvider::new());
    let service = service(&provider, &index_path);

    service.ingest(&[first], CommitMode::Merge).await.unwrap();
    let summary = service.ingest(&[second], CommitMode::Replace).await.unwrap();
    assert_eq!(summary.index_size, 1);

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    let only = index.entries().next().unwrap();
    assert_eq!(only.text(), "new content");
    assert!(only.id().as_str().ends_with("second.json#0"));
    assert_eq!(only.source_ref().media_file(), "second.mp4");
}

#[tokio::test]
async fn test_cached_vector_of_wrong_size_is_reembedded() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let seed = write_batch(temp_dir.path(), "seed", &["seed text"]);

    let stale = temp_dir.path().join("stale.json");
    std::fs::write(
        &stale,
        r#"[{"text": "stale text", "start": 0, "end": 1, "embedding": [0.5, 0.5]}]"#,
    )
    .unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    let service = service(&provider, &index_path);
    service.ingest(&[seed], CommitMode::Merge).await.unwrap();

    let summary = service.ingest(&[stale.clone()], CommitMode::Merge).await.unwrap();
    assert_eq!(summary.segments_reused, 0);
    assert_eq!(summary.segments_embedded, 1);
    assert_eq!(provider.calls(), 2);
    assert_eq!(read_json(&stale)[0]["embedding"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_backfill_embeds_pending_legacy_entries() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    std::fs::write(
        &index_path,
        r#"[
            {"text": "already done", "embedding": [1, 2, 1], "url": "talk.mp4#t=0"},
            {"text": "never embedded", "embedding": [], "url": "talk.mp4#t=5", "start": 5, "end": 7}
        ]"#,
    )
    .unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    let summary = service(&provider, &index_path).backfill().await.unwrap();

    assert_eq!(summary.pending, 1);
    assert_eq!(summary.filled, 1);
    assert_eq!(provider.calls(), 1);

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(index.searchable_entries().count(), 2);
    assert_eq!(index.pending_entries().count(), 0);
}

#[tokio::test]
async fn test_odd_timestamp_keeps_the_rest_of_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = temp_dir.path().join("talk.json");
    std::fs::write(
        &batch,
        r#"[
            {"text": "one", "start": 0, "end": 2},
            {"text": "two", "start": 5, "end": 4.99},
            {"text": "three", "start": 6, "end": 8}
        ]"#,
    )
    .unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    let summary = service(&provider, &index_path)
        .ingest(&[batch], CommitMode::Merge)
        .await
        .unwrap();

    assert_eq!(summary.batches_loaded, 1);
    assert!(summary.skipped_batches.is_empty());
    assert_eq!(summary.segments_embedded, 3);
    assert_eq!(summary.index_size, 3);

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    let second = index.entries().nth(1).unwrap();
    assert_eq!(second.text(), "two");
    assert_eq!(second.time_range().unwrap().start(), 5.0);
    assert_eq!(second.time_range().unwrap().end(), 5.0);
}

#[tokio::test]
async fn test_zero_vector_counts_as_failure() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = write_batch(temp_dir.path(), "talk", &["speech", "silence"]);

    let provider = Arc::new(ScriptedProvider::new().zero_on("silence"));
    let service = service(&provider, &index_path);

    let summary = service.ingest(&[batch.clone()], CommitMode::Merge).await.unwrap();
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].position, 1);
    assert!(matches!(
        summary.failures[0].error,
        EmbeddingError::InvalidResponse(_)
    ));

    // Never cached, never committed as a pending entry
    let written = read_json(&batch);
    assert!(written[1].get("embedding").is_none());
    assert!(written[1]["embedding_error"].as_str().unwrap().contains("zero"));

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.pending_entries().count(), 0);

    // A rerun reuses the good vector and reports the same failure again
    let rerun = service.ingest(&[batch], CommitMode::Merge).await.unwrap();
    assert_eq!(rerun.segments_reused, 1);
    assert_eq!(rerun.failed(), 1);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_write_back_failure_still_commits_index() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("index.json");
    let batch = write_batch(temp_dir.path(), "talk", &["first words", "last words"]);

    let provider = Arc::new(ScriptedProvider::new());
    let service = IngestionService::new(
        Arc::clone(&provider),
        JsonIndexStore::new(&index_path),
        ReadOnlyTranscripts(JsonTranscriptStore::new()),
    );

    let summary = service.ingest(&[batch.clone()], CommitMode::Merge).await.unwrap();

    assert_eq!(summary.segments_embedded, 2);
    assert_eq!(summary.batches_written, 0);
    assert_eq!(summary.write_back_failures.len(), 1);
    assert!(summary.write_back_failures[0].1.contains("read-only share"));
    assert!(summary.has_errors());

    let index = JsonIndexStore::new(&index_path).load().unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.searchable_entries().count(), 2);
    assert!(read_json(&batch)[0].get("embedding").is_none());
}
