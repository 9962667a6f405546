use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StashApiKeyParams {
    #[schemars(description = "OpenAI API key starting with 'sk-'. Only an opaque reference is returned.")]
    pub api_key: String,
}
