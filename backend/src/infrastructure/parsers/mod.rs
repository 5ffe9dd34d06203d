pub mod transcript_json;

pub use transcript_json::{ParseError, ParseResult, TranscriptJsonParser};
