//! Embedder trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding providers (e.g., OpenAI, Ollama, etc.)
///
/// Implementations convert text into vectors of a fixed dimension. A vector
/// of any other length must be reported as a provider error, never padded
/// or truncated.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; output order matches input order, one vector per input
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the vectors produced
    fn dimensions(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}
