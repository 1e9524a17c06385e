//! Common types used across the DocQA system

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scalar metadata value attached to a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{v}"),
            MetadataValue::Int(v) => write!(f, "{v}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// An indexed unit of text together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Size of the chunk as counted against a context budget.
    pub fn size(&self) -> usize {
        self.text.chars().count()
    }
}

/// A chunk returned by the index together with its score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<DocumentChunk>,
    pub score: f32,
}

/// A search hit placed at a rank for a single query
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub chunk: Arc<DocumentChunk>,
    pub score: f32,
    pub rank: usize,
}

impl RetrievedPassage {
    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// Passages selected for a prompt, in rank order, within a size budget.
#[derive(Debug, Clone)]
pub struct PromptContext {
    passages: Vec<RetrievedPassage>,
    budget: usize,
    used: usize,
}

impl PromptContext {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            passages: Vec::new(),
            budget,
            used: 0,
        }
    }

    /// Appends `passage` if it fits in the remaining budget.
    ///
    /// Returns `false` and leaves the context untouched otherwise.
    pub fn try_push(&mut self, passage: RetrievedPassage) -> bool {
        let size = passage.chunk.size();
        match self.used.checked_add(size) {
            Some(total) if total <= self.budget => {
                self.used = total;
                self.passages.push(passage);
                true
            }
            _ => false,
        }
    }

    pub fn passages(&self) -> &[RetrievedPassage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn sources(&self) -> Vec<SourceRef> {
        self.passages
            .iter()
            .map(|p| SourceRef {
                id: p.chunk.id.clone(),
                score: p.score,
            })
            .collect()
    }
}

/// A chunk cited in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub embedding_calls: u32,
    pub generation_tokens: u32,
}

/// Final answer returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub usage: Usage,
}
