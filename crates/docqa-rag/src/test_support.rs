//! Deterministic in-process fakes for engine tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docqa_core::{
    DocumentChunk, Embedder, Error, Generation, Generator, MetadataFilter, Metric, Result,
    ScoredChunk, VectorIndex,
};

use crate::store::MemoryConnection;
use crate::vector_index::PooledVectorIndex;

/// Embeds every text to a unit vector on the first axis unless a vector
/// was registered for it.
pub struct FakeEmbedder {
    dims: usize,
    vectors: HashMap<String, Vec<f32>>,
    delay: Option<Duration>,
    failure: Option<fn() -> Error>,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FakeEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vectors: HashMap::new(),
            delay: None,
            failure: None,
            failures_left: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `count` calls with `error` before answering normally.
    pub fn with_failures(mut self, count: u32, error: fn() -> Error) -> Self {
        self.failure = Some(error);
        self.failures_left = AtomicU32::new(count);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<Error> {
        let error = self.failure?;
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| error())
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_else(|| {
            let mut v = vec![0.0; self.dims];
            v[0] = 1.0;
            v
        })
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

pub enum Reply {
    Text(String),
    Fail(fn() -> Error),
    Hang,
}

/// Records prompts and answers with a fixed reply
pub struct FakeGenerator {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl FakeGenerator {
    pub fn answering(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str, _max_output: u32) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(Generation {
                text: text.clone(),
                tokens_used: text.split_whitespace().count() as u32,
            }),
            Reply::Fail(make) => Err(make()),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(Error::transient("generator hung"))
            }
        }
    }

    fn model_id(&self) -> &str {
        "fake-generator"
    }
}

/// Index returning a fixed hit list, duplicates included
pub struct StaticIndex {
    dimension: usize,
    hits: Vec<ScoredChunk>,
}

impl StaticIndex {
    pub fn new(dimension: usize, hits: Vec<ScoredChunk>) -> Self {
        Self { dimension, hits }
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn insert(&self, _chunk: DocumentChunk) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        _vector: &[f32],
        k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.hits.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> Metric {
        Metric::Cosine
    }
}

/// In-memory cosine index holding `rows` of `(id, text, embedding)`.
pub async fn seeded_index(
    dimension: usize,
    rows: &[(&str, &str, Vec<f32>)],
) -> Arc<PooledVectorIndex<MemoryConnection>> {
    let index =
        PooledVectorIndex::in_memory(dimension, Metric::Cosine, 2, Duration::from_millis(500))
            .unwrap();
    for (id, text, embedding) in rows {
        index
            .insert(DocumentChunk::new(*id, *text, embedding.clone()))
            .await
            .unwrap();
    }
    Arc::new(index)
}
