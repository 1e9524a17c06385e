//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::{DocumentChunk, Metadata, MetadataValue, Result, ScoredChunk};

/// Similarity metric, fixed per index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity, higher is better
    #[default]
    Cosine,
    /// Squared Euclidean distance, lower is better
    SquaredEuclidean,
}

impl Metric {
    /// Score `candidate` against `query`. Both slices must have equal length.
    pub fn score(self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::SquaredEuclidean => query
                .iter()
                .zip(candidate)
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
        }
    }

    /// Orders two scores so that the better one comes first.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::Cosine => b.total_cmp(&a),
            Metric::SquaredEuclidean => a.total_cmp(&b),
        }
    }

    /// Sorts hits best first, breaking score ties by ascending id.
    pub fn rank(self, hits: &mut [ScoredChunk]) {
        hits.sort_by(|a, b| {
            self.compare(a.score, b.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => f.write_str("cosine"),
            Metric::SquaredEuclidean => f.write_str("squared_euclidean"),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Conjunction of `key == value` conditions over chunk metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub must: Vec<(String, MetadataValue)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.must.push((key.into(), value.into()));
        self
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.must
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    }
}

/// Trait for vector indexes
///
/// Implementations validate vector dimensions before touching the
/// underlying store and return hits ranked best first under their metric,
/// ties broken by ascending id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a chunk by id
    async fn insert(&self, chunk: DocumentChunk) -> Result<()>;

    /// Return at most `k` nearest chunks to `vector`
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Get the total number of chunks
    async fn count(&self) -> Result<usize>;

    /// Dimension every stored and queried vector must have
    fn dimension(&self) -> usize;

    fn metric(&self) -> Metric;

    /// Connection usage of the backing store, if it reports any
    fn connection_stats(&self) -> Option<serde_json::Value> {
        None
    }

    /// Release store connections at shutdown
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn hit(id: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Arc::new(DocumentChunk::new(id, "", vec![])),
            score,
        }
    }

    #[test]
    fn test_cosine_ranks_higher_first_with_id_tiebreak() {
        let mut hits = vec![hit("b", 0.5), hit("c", 0.9), hit("a", 0.5)];
        Metric::Cosine.rank(&mut hits);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_euclidean_ranks_lower_first() {
        let mut hits = vec![hit("far", 4.0), hit("near", 0.25), hit("mid", 1.0)];
        Metric::SquaredEuclidean.rank(&mut hits);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_scores() {
        assert_eq!(Metric::SquaredEuclidean.score(&[1.0, 2.0], &[1.0, 0.0]), 4.0);
        assert!((Metric::Cosine.score(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(Metric::Cosine.score(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let mut metadata = Metadata::new();
        metadata.insert("lang".into(), "en".into());
        metadata.insert("page".into(), MetadataValue::Int(2));

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().eq("lang", "en").matches(&metadata));
        assert!(!MetadataFilter::new().eq("lang", "en").eq("page", 3i64).matches(&metadata));
        assert!(!MetadataFilter::new().eq("missing", true).matches(&metadata));
    }
}
