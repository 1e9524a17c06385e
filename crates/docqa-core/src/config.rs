//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Metric, Result, RetryPolicy};

/// What to do when retrieval finds nothing usable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoContextPolicy {
    /// Answer without sources, marking the prompt as having none
    Fallback,
    /// Fail the call with a no-context error
    #[default]
    Fail,
}

/// Options recognised by the query engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub top_k: usize,
    /// Characters of passage text allowed in one prompt
    pub context_budget: usize,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub pool_size: usize,
    pub pool_wait_timeout_ms: u64,
    pub no_context_policy: NoContextPolicy,
    pub max_query_chars: usize,
    pub metric: Metric,
    pub dimension: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_budget: 6000,
            max_output_tokens: 512,
            max_retries: 3,
            retry_backoff_base_ms: 200,
            retry_backoff_max_ms: 5000,
            pool_size: 4,
            pool_wait_timeout_ms: 2000,
            no_context_policy: NoContextPolicy::Fail,
            max_query_chars: 4096,
            metric: Metric::Cosine,
            dimension: 384,
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_backoff_base_ms),
        )
        .with_max_backoff(Duration::from_millis(self.retry_backoff_max_ms))
    }

    pub fn pool_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_wait_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("top_k", self.top_k),
            ("context_budget", self.context_budget),
            ("pool_size", self.pool_size),
            ("max_query_chars", self.max_query_chars),
            ("dimension", self.dimension),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Configuration(format!("{name} must be greater than zero")));
        }
        if self.max_output_tokens == 0 {
            return Err(Error::Configuration(
                "max_output_tokens must be greater than zero".to_string(),
            ));
        }
        if self.retry_backoff_max_ms < self.retry_backoff_base_ms {
            return Err(Error::Configuration(
                "retry_backoff_max_ms must not be below retry_backoff_base_ms".to_string(),
            ));
        }
        Ok(())
    }
}
