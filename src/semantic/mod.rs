//! Semantic enrichment and search over SQLite tables.
//!
//! - [`enrich`]: render a template per row, embed it, upsert into the shadow table
//! - [`search`]: embed a query and build/run the cosine-ranked join
//! - [`status`]: which tables carry embeddings, and how many rows are covered

pub mod enrich;
pub mod search;
pub mod status;
pub mod template;
pub mod types;
