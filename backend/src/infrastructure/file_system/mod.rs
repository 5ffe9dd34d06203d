pub mod discovery;

pub use discovery::discover_transcript_files;
