use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmbeddingColumnsParams {
    /// Optional table to restrict the report to.
    #[schemars(description = "Optional table to report on. Defaults to every table.")]
    pub table: Option<String>,
}
