pub mod index_repository;
pub mod transcript_repository;

pub use index_repository::{IndexRepository, StoreError, StoreResult};
pub use transcript_repository::TranscriptRepository;
