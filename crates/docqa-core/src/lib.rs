//! Core traits and types for DocQA
//!
//! This crate defines the fundamental traits and types used across the DocQA system.
//! It provides capability-facing interfaces for embedding providers, generation
//! providers and vector indexes, making the engine test-friendly and extensible.

pub mod cancel;
pub mod config;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod index;
pub mod retry;
pub mod types;

pub use cancel::CallContext;
pub use config::{EngineConfig, NoContextPolicy};
pub use embedder::Embedder;
pub use error::{AnswerError, Error, ErrorKind, Result, Stage};
pub use generator::{Generation, Generator};
pub use index::{MetadataFilter, Metric, VectorIndex};
pub use retry::{RetryPolicy, RetryingEmbedder, RetryingGenerator};
pub use types::*;

pub use tokio_util::sync::CancellationToken;
