//! Builds provider adapters selected by configuration

use std::sync::Arc;
use tracing::info;

use docqa_core::{Embedder, Generator, Result, RetryPolicy, RetryingEmbedder, RetryingGenerator};

use crate::config::{EmbedderSettings, EmbeddingProvider, GenerationProvider, GeneratorSettings};
use crate::ollama::OllamaEmbedder;
use crate::openai::{OpenAiEmbedder, OpenAiGenerator};
use crate::watsonx::WatsonxGenerator;

/// Build the configured embedder, wrapped in the shared retry policy.
pub fn build_embedder(
    settings: &EmbedderSettings,
    policy: RetryPolicy,
) -> Result<Arc<dyn Embedder>> {
    settings.validate()?;
    info!(
        provider = ?settings.provider,
        model = %settings.model,
        dimensions = settings.dimensions,
        "initializing embedder"
    );

    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::OpenAi => Arc::new(RetryingEmbedder::new(
            OpenAiEmbedder::new(settings)?,
            policy,
        )),
        EmbeddingProvider::Ollama => Arc::new(RetryingEmbedder::new(
            OllamaEmbedder::new(settings)?,
            policy,
        )),
    };
    Ok(embedder)
}

/// Build the configured generator, wrapped in the shared retry policy.
pub fn build_generator(
    settings: &GeneratorSettings,
    policy: RetryPolicy,
) -> Result<Arc<dyn Generator>> {
    settings.validate()?;
    info!(provider = ?settings.provider, model = %settings.model, "initializing generator");

    let generator: Arc<dyn Generator> = match settings.provider {
        GenerationProvider::OpenAi => Arc::new(RetryingGenerator::new(
            OpenAiGenerator::new(settings)?,
            policy,
        )),
        GenerationProvider::Watsonx => Arc::new(RetryingGenerator::new(
            WatsonxGenerator::new(settings)?,
            policy,
        )),
    };
    Ok(generator)
}
