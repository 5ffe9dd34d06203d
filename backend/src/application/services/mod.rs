pub mod ingestion_service;

pub use ingestion_service::{
    BackfillSummary, CommitMode, EntryFailure, IngestionError, IngestionProgressEvent,
    IngestionResult, IngestionService, IngestionSummary, ProgressCallback, SegmentFailure,
    DEFAULT_CONCURRENCY,
};
