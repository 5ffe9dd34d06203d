pub mod atomic_write;
pub mod json_index_store;
pub mod memory_index_store;
pub mod schema;
pub mod transcript_store;

pub use atomic_write::write_atomically;
pub use json_index_store::JsonIndexStore;
pub use memory_index_store::MemoryIndexStore;
pub use schema::{IndexEntryRecord, SegmentRecord, UNKNOWN_SOURCE};
pub use transcript_store::JsonTranscriptStore;
