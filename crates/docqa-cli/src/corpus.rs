//! Seeding the index from a JSONL corpus

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use docqa_core::{DocumentChunk, Embedder, Error, Metadata, Result, VectorIndex};

/// Texts sent per `embed_batch` call
pub const EMBED_BATCH_SIZE: usize = 32;
const EMBED_CONCURRENCY: usize = 2;

/// One line of a corpus file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Read `{id, text, metadata?}` records, one JSON object per line.
/// Blank lines are skipped.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CorpusRecord = serde_json::from_str(&line).map_err(|e| {
            Error::Serialization(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        records.push(record);
    }

    debug!(path = %path.display(), records = records.len(), "read corpus");
    Ok(records)
}

/// Embed `records` in batches and insert them into `index`.
///
/// Returns the number of chunks written; a repeated id replaces the
/// earlier row.
pub async fn seed_index(
    records: Vec<CorpusRecord>,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch size must be greater than zero".to_string()));
    }

    let batches: Vec<Vec<CorpusRecord>> = records
        .chunks(batch_size)
        .map(|batch| batch.to_vec())
        .collect();

    let mut embedded = stream::iter(batches)
        .map(|batch| async move {
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            Ok::<_, Error>((batch, vectors))
        })
        .buffered(EMBED_CONCURRENCY);

    let mut written = 0;
    while let Some(result) = embedded.next().await {
        let (batch, vectors) = result?;
        if vectors.len() != batch.len() {
            return Err(Error::permanent(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }

        for (record, embedding) in batch.into_iter().zip(vectors) {
            index
                .insert(DocumentChunk {
                    id: record.id,
                    text: record.text,
                    embedding,
                    metadata: record.metadata,
                })
                .await?;
            written += 1;
        }
        debug!(written, "inserted batch");
    }

    info!(chunks = written, "corpus indexed");
    Ok(written)
}
