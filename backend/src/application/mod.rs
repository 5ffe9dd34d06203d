pub mod dto;
pub mod repositories;
pub mod services;
pub mod use_cases;

// Re-export key types to avoid naming conflicts
pub use dto::{MatchResult, SearchOutcome, SearchRequest};
pub use repositories::{IndexRepository, StoreError, StoreResult, TranscriptRepository};
pub use services::{
    BackfillSummary, CommitMode, IngestionError, IngestionProgressEvent, IngestionResult,
    IngestionService, IngestionSummary, ProgressCallback,
};
pub use use_cases::{DescribeIndex, IndexStats, SearchError, SemanticSearch};
