//! Generator trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Result of a text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub tokens_used: u32,
}

/// Trait for LLM providers (e.g., WatsonX, OpenAI, etc.)
///
/// The returned text is passed through verbatim. Policy rejections surface
/// as [`crate::Error::ContentPolicy`] and are never retried.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate at most `max_output` tokens for `prompt`
    async fn generate(&self, prompt: &str, max_output: u32) -> Result<Generation>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
