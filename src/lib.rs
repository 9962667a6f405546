//! Semantic search for SQLite tables.
//!
//! `sqlembed` computes text embeddings for the rows of a table through a remote
//! embeddings API and stores them in a companion *shadow table*. Ranking is
//! ordinary SQL: a registered `embeddings_cosine()` function compares each
//! stored vector against the query vector in a brute-force scan.
//!
//! | Source table | Shadow table | Columns |
//! |--------------|--------------|---------|
//! | `items` | `_embeddings_items` | primary key columns + one `emb_<model>` BLOB per model |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`credentials`]: API key resolution from trusted config or a reference-token stash
//! - [`db`]: Connection setup, SQL functions, and the shadow-table schema
//! - [`embedding`]: Model catalogue and the remote embedding client
//! - [`semantic`]: Batch enrichment, query building, and coverage status
//! - [`vector`]: Little-endian `f32` codec and cosine similarity

pub mod config;
pub mod credentials;
pub mod db;
pub mod embedding;
pub mod error;
pub mod semantic;
pub mod vector;

pub use error::{Error, Result};
