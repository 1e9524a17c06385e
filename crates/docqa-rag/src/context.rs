//! Process-wide engine dependencies

use std::sync::Arc;
use tracing::info;

use docqa_core::{Embedder, EngineConfig, Error, Generator, Result, VectorIndex};

use crate::vector_index::PooledVectorIndex;

/// Configuration, provider clients and the vector index, built once at
/// startup and shared by every query.
pub struct EngineContext {
    config: EngineConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Arc<dyn VectorIndex>,
}

impl EngineContext {
    /// Fails with [`Error::Configuration`] when the config is invalid or the
    /// embedder and index disagree on vector dimension.
    pub fn new(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;

        if embedder.dimensions() != index.dimension() {
            return Err(Error::Configuration(format!(
                "embedder {} produces {}-dimensional vectors but the index expects {}",
                embedder.model_name(),
                embedder.dimensions(),
                index.dimension()
            )));
        }
        if config.dimension != index.dimension() {
            return Err(Error::Configuration(format!(
                "configured dimension {} does not match index dimension {}",
                config.dimension,
                index.dimension()
            )));
        }

        info!(
            embedder = embedder.model_name(),
            generator = generator.model_id(),
            dimension = index.dimension(),
            metric = %index.metric(),
            "engine context ready"
        );
        Ok(Self {
            config,
            embedder,
            generator,
            index,
        })
    }

    /// Context over a fresh in-memory index sized from `config`.
    pub fn in_memory(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let index = PooledVectorIndex::in_memory(
            config.dimension,
            config.metric,
            config.pool_size,
            config.pool_wait_timeout(),
        )?;
        Self::new(config, embedder, generator, Arc::new(index))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Close the index connections; queries after this fail.
    pub fn shutdown(&self) {
        self.index.close();
        info!("engine context shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeEmbedder, FakeGenerator};

    #[test]
    fn test_dimension_mismatch_is_startup_error() {
        let config = EngineConfig {
            dimension: 3,
            ..Default::default()
        };
        let err = EngineContext::in_memory(
            config,
            Arc::new(FakeEmbedder::new(4)),
            Arc::new(FakeGenerator::answering("ok")),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            pool_size: 0,
            dimension: 2,
            ..Default::default()
        };
        let err = EngineContext::in_memory(
            config,
            Arc::new(FakeEmbedder::new(2)),
            Arc::new(FakeGenerator::answering("ok")),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_index() {
        let config = EngineConfig {
            dimension: 2,
            ..Default::default()
        };
        let context = EngineContext::in_memory(
            config,
            Arc::new(FakeEmbedder::new(2)),
            Arc::new(FakeGenerator::answering("ok")),
        )
        .unwrap();
        context.shutdown();
        assert!(matches!(
            context.index().count().await,
            Err(Error::ResourceExhausted(_))
        ));
    }
}
