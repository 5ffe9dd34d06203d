//! Semantic search over timestamped transcript segments.
//!
//! Transcript batches are embedded through an HTTP embedding service,
//! committed to a JSON vector index and ranked by cosine similarity.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
