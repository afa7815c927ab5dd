//! OpenAI embedding client

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use tracing::{debug, info};

use crate::{
    error::{EmbeddingError, Result},
    types::EmbeddingVector,
};

/// OpenAI embedding client
///
/// Expensive to construct relative to a scoring call; build once and share
/// behind an `Arc`. Embeddings are deterministic for identical input within
/// a process lifetime.
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// Uses text-embedding-3-small model (1536 dimensions)
    pub fn new(api_key: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    /// Create a client from the OPENAI_API_KEY environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EmbeddingError::Config("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Generate an embedding for one section's text
    ///
    /// Empty text is embedded like any other input; section texts are never
    /// validated or rejected here. Provider failures propagate as a hard
    /// error for the whole request.
    pub async fn embed_text(&self, text: &str) -> Result<EmbeddingVector> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            encoding_format: None,
            dimensions: None,
            user: None,
        };

        debug!("Embedding text with length: {} chars", text.len());
        let response = self.client.embeddings().create(request).await?;

        if response.data.is_empty() {
            return Err(EmbeddingError::Config(
                "No embeddings returned from API".to_string(),
            ));
        }

        let embedding = response.data[0].embedding.clone();

        // Validate dimension
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        info!(
            "Generated embedding: dimension={}, model={}",
            embedding.len(),
            self.model
        );

        Ok(embedding)
    }

    /// Get the embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_text() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key);

        let embedding = client
            .embed_text("A smart async communication platform for distributed teams")
            .await
            .expect("Failed to generate embedding");

        assert_eq!(embedding.len(), 1536);
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_empty_text_is_not_rejected() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key);

        let embedding = client
            .embed_text("")
            .await
            .expect("Failed to generate embedding");

        assert_eq!(embedding.len(), client.dimension());
    }
}
