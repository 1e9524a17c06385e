//! Vector index over a pooled chunk store

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use docqa_core::{
    DocumentChunk, Error, MetadataFilter, Metric, Result, ScoredChunk, VectorIndex,
};

use crate::pool::{ConnectionPool, PoolStatus};
use crate::store::{MemoryConnection, MemoryStore, StoreConnection};

/// [`VectorIndex`] that checks dimensions up front and runs every store
/// call on a connection borrowed from a bounded pool.
pub struct PooledVectorIndex<C> {
    pool: ConnectionPool<C>,
    dimension: usize,
    metric: Metric,
}

impl<C: StoreConnection + 'static> PooledVectorIndex<C> {
    pub fn new(pool: ConnectionPool<C>, dimension: usize, metric: Metric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            pool,
            dimension,
            metric,
        })
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl PooledVectorIndex<MemoryConnection> {
    /// Index backed by a fresh [`MemoryStore`] with `pool_size` connections.
    pub fn in_memory(
        dimension: usize,
        metric: Metric,
        pool_size: usize,
        wait_timeout: Duration,
    ) -> Result<Self> {
        let store = MemoryStore::new();
        let pool = ConnectionPool::new(store.connections(pool_size), wait_timeout)?;
        Self::new(pool, dimension, metric)
    }
}

#[async_trait]
impl<C: StoreConnection + 'static> VectorIndex for PooledVectorIndex<C> {
    async fn insert(&self, chunk: DocumentChunk) -> Result<()> {
        if chunk.id.is_empty() {
            return Err(Error::InvalidArgument("chunk id must not be empty".to_string()));
        }
        self.check_dimension(&chunk.embedding)?;

        let conn = self.pool.acquire().await?;
        conn.upsert(chunk).await
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be greater than zero".to_string()));
        }
        self.check_dimension(vector)?;

        let mut hits = {
            let conn = self.pool.acquire().await?;
            conn.nearest(vector, self.metric, k, filter).await?
        };

        // stores may hand back unranked or duplicate rows
        self.metric.rank(&mut hits);
        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.chunk.id.clone()));
        hits.truncate(k);

        debug!(k, hits = hits.len(), metric = %self.metric, "index search complete");
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.pool.acquire().await?;
        conn.count().await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn connection_stats(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.pool.status()).ok()
    }

    fn close(&self) {
        self.pool.close();
    }
}
