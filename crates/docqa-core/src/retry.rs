//! Bounded retry with exponential backoff for provider calls

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::{Embedder, Generation, Generator, Result};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            ..Default::default()
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before the given retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        operation,
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Applies a [`RetryPolicy`] to every call of the wrapped embedder
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.policy.run("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.policy
            .run("embed_batch", || self.inner.embed_batch(texts))
            .await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Applies a [`RetryPolicy`] to every call of the wrapped generator
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    async fn generate(&self, prompt: &str, max_output: u32) -> Result<Generation> {
        self.policy
            .run("generate", || self.inner.generate(prompt, max_output))
            .await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(350));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::transient("503"))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let err = fast_policy(2)
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::transient("timed out"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { retriable: true, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_content_policy_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = fast_policy(5)
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::ContentPolicy("blocked".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContentPolicy(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct FlakyGenerator {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl Generator for FlakyGenerator {
        async fn generate(&self, prompt: &str, _max_output: u32) -> Result<Generation> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::transient("429"));
            }
            Ok(Generation {
                text: prompt.to_uppercase(),
                tokens_used: 3,
            })
        }

        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_retrying_generator_wraps_inner() {
        let generator = RetryingGenerator::new(
            FlakyGenerator {
                failures_left: AtomicU32::new(1),
            },
            fast_policy(1),
        );
        let out = generator.generate("hi", 10).await.unwrap();
        assert_eq!(out.text, "HI");
        assert_eq!(generator.model_id(), "flaky");
    }

    struct FlakyEmbedder {
        failures_left: AtomicU32,
        failure: fn() -> Error,
        calls: AtomicU32,
    }

    impl FlakyEmbedder {
        fn new(failures: u32, failure: fn() -> Error) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                failure,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn attempt(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            {
                Ok(_) => Err((self.failure)()),
                Err(_) => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.attempt()?;
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.attempt()?;
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "flaky-embedder"
        }
    }

    #[tokio::test]
    async fn test_retrying_embedder_recovers_from_transient_failures() {
        let embedder = RetryingEmbedder::new(
            FlakyEmbedder::new(2, || Error::transient("503 service unavailable")),
            fast_policy(3),
        );
        assert_eq!(embedder.embed("abc").await.unwrap(), vec![3.0, 1.0]);
        assert_eq!(embedder.inner().calls(), 3);
        assert_eq!(embedder.dimensions(), 2);
        assert_eq!(embedder.model_name(), "flaky-embedder");
    }

    #[tokio::test]
    async fn test_retrying_embedder_exhausts_budget() {
        let embedder = RetryingEmbedder::new(
            FlakyEmbedder::new(u32::MAX, || Error::transient("timed out")),
            fast_policy(2),
        );
        let err = embedder.embed("abc").await.unwrap_err();
        assert!(matches!(err, Error::Provider { retriable: true, .. }));
        assert_eq!(embedder.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_retrying_embedder_stops_on_permanent_failure() {
        let embedder = RetryingEmbedder::new(
            FlakyEmbedder::new(u32::MAX, || Error::permanent("401 unauthorized")),
            fast_policy(4),
        );
        let texts = vec!["a".to_string(), "bb".to_string()];
        let err = embedder.embed_batch(&texts).await.unwrap_err();
        assert!(matches!(err, Error::Provider { retriable: false, .. }));
        assert_eq!(embedder.inner().calls(), 1);
    }
}
