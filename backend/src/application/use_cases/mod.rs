pub mod index_stats;
pub mod semantic_search;

pub use index_stats::{DescribeIndex, IndexStats};
pub use semantic_search::{SearchError, SearchResult, SemanticSearch};
