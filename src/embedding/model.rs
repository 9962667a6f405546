//! The supported embedding model catalogue.
//!
//! Model identifiers may carry a trailing `-<digits>` dimensionality suffix
//! (`text-embedding-3-large-256`). The suffix is sent upstream as `dimensions`
//! and stripped from the model name. Each identifier maps to a shadow-table
//! column `emb_<identifier with '-' replaced by '_'>`.

use crate::error::{Error, Result};

/// Prefix shared by every embedding column in a shadow table.
pub const COLUMN_PREFIX: &str = "emb_";

/// Allow-listed embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum EmbeddingModel {
    Large256,
    #[default]
    Small512,
    Large1024,
    Small,
    Large,
}

/// The upstream request parameters derived from a model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Model name sent to the embedding service.
    pub name: String,
    /// Explicit output dimensionality, when the identifier ends in digits.
    pub dimensions: Option<u32>,
}

impl EmbeddingModel {
    pub const ALL: [EmbeddingModel; 5] = [
        Self::Large256,
        Self::Small512,
        Self::Large1024,
        Self::Small,
        Self::Large,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Large256 => "text-embedding-3-large-256",
            Self::Small512 => "text-embedding-3-small-512",
            Self::Large1024 => "text-embedding-3-large-1024",
            Self::Small => "text-embedding-3-small",
            Self::Large => "text-embedding-3-large",
        }
    }

    pub fn upstream_name(&self) -> &'static str {
        match self {
            Self::Large256 | Self::Large1024 | Self::Large => "text-embedding-3-large",
            Self::Small512 | Self::Small => "text-embedding-3-small",
        }
    }

    /// The `dimensions` request field, if the identifier asks for one.
    pub fn dimensions(&self) -> Option<u32> {
        match self {
            Self::Large256 => Some(256),
            Self::Small512 => Some(512),
            Self::Large1024 => Some(1024),
            Self::Small | Self::Large => None,
        }
    }

    /// Length of the vectors this model returns.
    pub fn output_dimensions(&self) -> usize {
        match self {
            Self::Small => 1536,
            Self::Large => 3072,
            other => other.dimensions().map_or(0, |d| d as usize),
        }
    }

    /// Shadow-table column holding this model's vectors.
    pub fn column_name(&self) -> String {
        column_name(self.identifier())
    }

    /// Look up an allow-listed model by its identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.identifier() == identifier)
    }

    /// Recover the model that produced a shadow-table column, if it is allow-listed.
    pub fn from_column(column: &str) -> Option<Self> {
        model_identifier_for_column(column).and_then(|id| Self::from_identifier(&id))
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

impl std::str::FromStr for EmbeddingModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_identifier(s).ok_or_else(|| {
            let supported: Vec<&str> = Self::ALL.iter().map(|m| m.identifier()).collect();
            Error::Configuration(format!(
                "unsupported model: {s}. Supported: {}",
                supported.join(", ")
            ))
        })
    }
}

/// Split a model identifier into upstream name and optional dimensionality.
///
/// If the token after the last `-` is all ASCII digits it becomes `dimensions`
/// and the rest (hyphens preserved) is the name. This is the general rule the
/// [`EmbeddingModel`] catalogue is checked against; requests go through the
/// catalogue's `upstream_name` and `dimensions`.
pub fn parse_model_identifier(identifier: &str) -> ModelSpec {
    if let Some((name, last)) = identifier.rsplit_once('-') {
        if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(dimensions) = last.parse::<u32>() {
                return ModelSpec {
                    name: name.to_string(),
                    dimensions: Some(dimensions),
                };
            }
        }
    }
    ModelSpec {
        name: identifier.to_string(),
        dimensions: None,
    }
}

/// `text-embedding-3-small` -> `emb_text_embedding_3_small`
pub fn column_name(identifier: &str) -> String {
    format!("{COLUMN_PREFIX}{}", identifier.replace('-', "_"))
}

/// Inverse of [`column_name`]. `None` if the column lacks the `emb_` prefix.
pub fn model_identifier_for_column(column: &str) -> Option<String> {
    column
        .strip_prefix(COLUMN_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.replace('_', "-"))
}
