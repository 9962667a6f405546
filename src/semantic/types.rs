//! Core type definitions for enrichment and search.

use rusqlite::types::Value;
use serde::Serialize;

use crate::embedding::EmbeddingModel;
use crate::error::{Error, Result};

/// One source-table row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub columns: Vec<(String, Value)>,
}

impl SourceRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(c, _)| c == name).map(|(_, v)| v)
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(c, v)| (c.into(), v)).collect(),
        }
    }
}

/// Validated per-run enrichment settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentOptions {
    pub model: EmbeddingModel,
    pub template: String,
}

impl EnrichmentOptions {
    /// Validate a model identifier and template once, up front.
    pub fn new(model: &str, template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(Error::Configuration("Template is required.".into()));
        }
        Ok(Self {
            model: model.parse()?,
            template: template.to_string(),
        })
    }
}

/// Result of embedding one row.
#[derive(Debug)]
pub struct RowOutcome {
    /// Primary-key values in key declaration order.
    pub primary_key: Vec<Value>,
    pub result: Result<()>,
}

/// Per-row outcomes of one batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn done_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.len() - self.done_count()
    }

    /// Failed rows paired with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&[Value], &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.primary_key.as_slice(), e)))
    }
}

/// A serializable summary of a failed row.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub primary_key: Vec<serde_json::Value>,
    pub error: String,
}

/// Totals over a whole-table enrichment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentSummary {
    pub table: String,
    pub model: String,
    pub done_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

impl EnrichmentSummary {
    pub fn absorb(&mut self, report: &BatchReport) {
        self.done_count += report.done_count();
        self.error_count += report.error_count();
        self.errors.extend(report.failures().map(|(pk, err)| RowError {
            primary_key: pk.iter().map(value_to_json).collect(),
            error: err.to_string(),
        }));
    }
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Source-row columns (the `_similarity` alias excluded).
    pub row: serde_json::Map<String, serde_json::Value>,
    /// `None` when the stored vector has zero norm.
    pub similarity: Option<f64>,
}

/// Text used when a row value is substituted into a template. NULL is empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// JSON rendering for output. Blobs are summarised rather than dumped.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::json!(i),
        Value::Real(f) => serde_json::json!(f),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    }
}
