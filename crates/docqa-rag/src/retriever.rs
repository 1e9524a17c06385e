//! Query retrieval: embed, search, dedupe and fit passages to a budget

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use docqa_core::{
    CallContext, Embedder, Error, MetadataFilter, PromptContext, Result, RetrievedPassage,
    VectorIndex,
};

/// Turns a query into a ranked, budget-trimmed [`PromptContext`]
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn retrieve(&self, query: &str, k: usize, budget: usize) -> Result<PromptContext> {
        self.retrieve_with(query, k, budget, None, &CallContext::default())
            .await
    }

    /// Retrieve under a caller deadline, optionally restricted by metadata.
    ///
    /// The query is embedded exactly once. Passages are added in rank order
    /// and selection stops at the first one that would overflow `budget`.
    /// Fails with [`Error::NoResults`] only when the index returns nothing.
    pub async fn retrieve_with(
        &self,
        query: &str,
        k: usize,
        budget: usize,
        filter: Option<&MetadataFilter>,
        call: &CallContext,
    ) -> Result<PromptContext> {
        let vector = call.run(self.embedder.embed(query)).await?;
        let candidates = call.run(self.index.search(&vector, k, filter)).await?;

        if candidates.is_empty() {
            return Err(Error::NoResults(format!(
                "no indexed chunks matched the query (k={k})"
            )));
        }

        let mut seen = HashSet::new();
        let passages = candidates
            .into_iter()
            .filter(|hit| seen.insert(hit.chunk.id.clone()))
            .enumerate()
            .map(|(rank, hit)| RetrievedPassage {
                chunk: hit.chunk,
                score: hit.score,
                rank,
            });

        let mut context = PromptContext::with_budget(budget);
        let mut candidate_count = 0;
        for passage in passages {
            candidate_count += 1;
            if !context.try_push(passage) {
                break;
            }
        }

        debug!(
            candidates = candidate_count,
            selected = context.len(),
            used = context.used(),
            budget,
            "retrieved context"
        );
        Ok(context)
    }
}
