pub mod search;

pub use search::{MatchResult, SearchOutcome, SearchRequest, DEFAULT_TOP_K};
