//! OpenAI-compatible `/v1/embeddings` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbeddingModel};
use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// Embedder that POSTs `{input, model, dimensions?}` with a bearer token.
///
/// Holds a single `reqwest::Client` so a batch reuses one connection pool.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for OpenAiEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, api_key: &str, text: &str, model: EmbeddingModel) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            input: text,
            model: model.upstream_name(),
            dimensions: model.dimensions(),
        };

        tracing::debug!(
            model = %model,
            upstream = body.model,
            dimensions = ?body.dimensions,
            text_len = text.len(),
            "requesting embedding"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %model, "embedding request rejected");
            return Err(Error::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::InvalidResponse("response contained no embeddings".into()))?;

        if embedding.len() != model.output_dimensions() {
            tracing::warn!(
                model = %model,
                expected = model.output_dimensions(),
                actual = embedding.len(),
                "embedding length differs from model catalogue"
            );
        }

        Ok(embedding)
    }
}
