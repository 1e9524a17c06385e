//! Ollama embedding adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::{Embedder, Error, Result};

use crate::config::EmbedderSettings;
use crate::http::{build_client, check_vectors, send_json};

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama embedding provider.
///
/// Talks to a local Ollama server; no authentication.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    pub fn new(settings: &EmbedderSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.endpoint().to_string(),
            model: settings.model.clone(),
            dims: settings.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| Error::permanent("Empty response from Ollama"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OllamaEmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");

        let response: OllamaEmbeddingResponse = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/api/embed", self.endpoint))
                .json(&request),
        )
        .await?;

        check_vectors(PROVIDER, texts.len(), self.dims, &response.embeddings)?;
        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
