//! OpenAI-compatible embedding and chat completion adapters
//!
//! Any endpoint that speaks the OpenAI `/embeddings` and `/chat/completions`
//! wire format works here (OpenAI, Azure-style proxies, vLLM, LiteLLM).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::{Embedder, Error, Generation, Generator, Result};

use crate::config::{EmbedderSettings, GeneratorSettings};
use crate::http::{build_client, check_vectors, send_json};

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

fn parse_embeddings(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

/// OpenAI embedding adapter
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbedder {
    pub fn new(settings: &EmbedderSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            Error::Configuration("OpenAI embedder requires an API key".to_string())
        })?;
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.endpoint().to_string(),
            api_key,
            model: settings.model.clone(),
            dims: settings.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| Error::permanent("Empty response from OpenAI"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dims,
        };
        debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");

        let response: EmbeddingResponse = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/embeddings", self.endpoint))
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        let vectors = parse_embeddings(response);
        check_vectors(PROVIDER, texts.len(), self.dims, &vectors)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    completion_tokens: u32,
}

fn parse_chat(response: ChatResponse) -> Result<Generation> {
    let tokens_used = response.usage.map_or(0, |u| u.completion_tokens);
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::permanent("OpenAI returned no choices"))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(Error::ContentPolicy(
            "OpenAI stopped generation with a content filter".to_string(),
        ));
    }

    Ok(Generation {
        text: choice.message.content.unwrap_or_default(),
        tokens_used,
    })
}

/// OpenAI chat completion adapter
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiGenerator {
    pub fn new(settings: &GeneratorSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            Error::Configuration("OpenAI generator requires an API key".to_string())
        })?;
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.endpoint().to_string(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, max_output: u32) -> Result<Generation> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: max_output,
            temperature: self.temperature,
        };
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response: ChatResponse = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/chat/completions", self.endpoint))
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        parse_chat(response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
