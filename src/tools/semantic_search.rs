//! MCP `semantic_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `semantic_search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    #[schemars(description = "Enriched table to search")]
    pub table: String,

    #[schemars(description = "Natural language search query")]
    pub query: String,

    #[schemars(description = "Maximum number of rows to return. Defaults to the configured limit.")]
    pub max_results: Option<usize>,

    #[schemars(description = "Reference returned by stash_api_key")]
    pub api_key_ref: Option<String>,

    #[schemars(description = "Return only the generated SQL and query vector without running it")]
    pub sql_only: Option<bool>,
}
