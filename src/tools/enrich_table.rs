use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EnrichTableParams {
    #[schemars(description = "Name of the table whose rows should be embedded")]
    pub table: String,

    #[schemars(
        description = "Embedding model, e.g. 'text-embedding-3-small-512' or 'text-embedding-3-large-256'. Defaults to the configured model."
    )]
    pub model: Option<String>,

    #[schemars(
        description = "Template rendered per row, e.g. '{{ title }} {{ body }}'. Defaults to every column."
    )]
    pub template: Option<String>,

    #[schemars(description = "Reference returned by stash_api_key. Not needed when the server has a key configured.")]
    pub api_key_ref: Option<String>,

    #[schemars(description = "Rows embedded per batch. Defaults to the configured batch size.")]
    pub batch_size: Option<usize>,
}
