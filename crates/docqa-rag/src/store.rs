//! Chunk store behind the vector index

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use docqa_core::{DocumentChunk, Error, MetadataFilter, Metric, Result, ScoredChunk};

/// One connection to a chunk store.
///
/// Connections are handed out by a [`crate::ConnectionPool`]. They hold no
/// per-call state, so every method takes `&self`.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Insert or replace the row keyed by `chunk.id`
    async fn upsert(&self, chunk: DocumentChunk) -> Result<()>;

    /// Up to `k` rows closest to `query`, ranked best first
    async fn nearest(
        &self,
        query: &[f32],
        metric: Metric,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;
}

type Table = Arc<RwLock<HashMap<String, Arc<DocumentChunk>>>>;

/// In-process table of `(id, content, embedding, metadata)` rows
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Table,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `size` connections sharing this table.
    pub fn connections(&self, size: usize) -> Vec<MemoryConnection> {
        (0..size)
            .map(|_| MemoryConnection {
                rows: Arc::clone(&self.rows),
            })
            .collect()
    }
}

pub struct MemoryConnection {
    rows: Table,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn upsert(&self, chunk: DocumentChunk) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        let id = chunk.id.clone();
        let replaced = rows.insert(id.clone(), Arc::new(chunk)).is_some();
        debug!(id = %id, replaced, "stored chunk");
        Ok(())
    }

    async fn nearest(
        &self,
        query: &[f32],
        metric: Metric,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let mut hits: Vec<ScoredChunk> = {
            let rows = self
                .rows
                .read()
                .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
            rows.values()
                .filter(|chunk| filter.is_none_or(|f| f.matches(&chunk.metadata)))
                .map(|chunk| ScoredChunk {
                    score: metric.score(query, &chunk.embedding),
                    chunk: Arc::clone(chunk),
                })
                .collect()
        };

        metric.rank(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let rows = self
            .rows
            .read()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connections_share_rows() {
        let store = MemoryStore::new();
        let conns = store.connections(2);
        conns[0]
            .upsert(DocumentChunk::new("a", "alpha", vec![1.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(conns[1].count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nearest_applies_filter_before_k() {
        let store = MemoryStore::new();
        let conn = store.connections(1).pop().unwrap();
        conn.upsert(DocumentChunk::new("a", "a", vec![1.0, 0.0]).with_metadata("lang", "de"))
            .await
            .unwrap();
        conn.upsert(DocumentChunk::new("b", "b", vec![0.5, 0.5]).with_metadata("lang", "en"))
            .await
            .unwrap();

        let filter = MetadataFilter::new().eq("lang", "en");
        let hits = conn
            .nearest(&[1.0, 0.0], Metric::Cosine, 1, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "b");
    }
}
