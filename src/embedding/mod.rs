//! Text-to-vector embedding via a remote service.
//!
//! Provides the [`Embedder`] trait, the allow-listed [`EmbeddingModel`]
//! catalogue, and an OpenAI-compatible HTTP implementation created via
//! [`create_embedder`] from configuration.

pub mod model;
pub mod openai;

use async_trait::async_trait;

use crate::error::Result;
pub use model::EmbeddingModel;

/// Trait for turning text into a vector with a given model.
///
/// One call is one upstream request; implementations do not cache or retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, api_key: &str, text: &str, model: EmbeddingModel) -> Result<Vec<f32>>;
}

/// Create the embedder described by config.
pub fn create_embedder(config: &crate::config::EmbeddingConfig) -> openai::OpenAiEmbedder {
    openai::OpenAiEmbedder::new(&config.endpoint)
}
