//! Retrieval-augmented query engine for DocQA
//!
//! This crate provides the pooled vector index, the retriever, prompt
//! assembly and the [`QueryEngine`] that ties them to the providers.

mod context;
mod engine;
mod pool;
mod prompt;
mod retriever;
mod store;
mod vector_index;

#[cfg(test)]
mod test_support;

pub use context::EngineContext;
pub use engine::{AnswerOptions, QueryEngine};
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use prompt::{NO_SOURCES_MARKER, build_fallback_prompt, build_prompt};
pub use retriever::Retriever;
pub use store::{MemoryConnection, MemoryStore, StoreConnection};
pub use vector_index::PooledVectorIndex;

// Re-export core types for convenience
pub use docqa_core::{
    AnswerError, AnswerResult, CallContext, DocumentChunk, EngineConfig, Error, MetadataFilter,
    Result, Stage, VectorIndex,
};
