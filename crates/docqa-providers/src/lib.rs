//! Provider adapters for DocQA
//!
//! This crate provides concrete implementations of the `Embedder` and
//! `Generator` traits (OpenAI-compatible, Ollama, WatsonX) and a factory
//! that selects one of each from configuration.

mod config;
mod factory;
mod http;
mod ollama;
mod openai;
mod watsonx;


pub use config::{
    EmbedderSettings, EmbeddingProvider, GenerationProvider, GeneratorSettings,
    OLLAMA_API_URL, OPENAI_API_URL, WATSONX_API_URL, WATSONX_IAM_URL,
};
pub use factory::{build_embedder, build_generator};
pub use ollama::OllamaEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiGenerator};
pub use watsonx::WatsonxGenerator;

// Re-export core types for convenience
pub use docqa_core::{Embedder, Error, Generation, Generator, Result, RetryPolicy};
