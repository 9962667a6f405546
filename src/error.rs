//! Error taxonomy for the embedding core.
//!
//! Every variant carries enough detail to build a user-facing message. Raw
//! credential values never appear in any of them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable API key could be resolved.
    #[error("{0}")]
    Credential(String),

    /// The embedding endpoint answered with a non-success status.
    #[error("embedding service returned HTTP {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// The endpoint answered 2xx but the payload was not what we expect.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A stored vector's byte length is not a multiple of 4.
    #[error("malformed vector: {len} bytes is not a multiple of 4")]
    MalformedVector { len: usize },

    /// Creating or altering a shadow table failed.
    #[error("schema change on {table} failed: {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A required setting is missing or outside the allow-list.
    #[error("{0}")]
    Configuration(String),

    /// The table has no allow-listed embedding column to search against.
    #[error("table {0} has no embeddings; run an enrichment first")]
    NotEmbedded(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Row-scoped errors are reported per row and do not stop a batch.
    pub fn is_row_scoped(&self) -> bool {
        matches!(
            self,
            Self::RemoteService { .. }
                | Self::InvalidResponse(_)
                | Self::Transport(_)
                | Self::MalformedVector { .. }
                | Self::Configuration(_)
                | Self::Database(_)
        )
    }
}
