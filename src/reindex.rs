//! Bulk (re)indexing of the case library into the vector index.
//!
//! Documents are processed in batches. Within a batch every document is
//! embedded and upserted concurrently; batches run one after another with
//! a pause in between to stay under upstream rate limits. A document that
//! fails to embed or upsert is logged and counted, and the run continues.

use anyhow::{Context, Result};
use casebook_core::{Document, DocumentStore, SemanticIndex};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ReindexOptions {
    /// Clear the index before indexing.
    pub reset: bool,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub max_input_chars: usize,
}

impl ReindexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reset: false,
            batch_size: config.index.batch_size,
            batch_pause: Duration::from_millis(config.index.batch_pause_ms),
            max_input_chars: config.embedding.max_input_chars,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Metadata stored next to each vector.
pub fn index_metadata(doc: &Document) -> serde_json::Value {
    json!({
        "title": doc.title,
        "category": doc.category,
        "difficulty": doc.difficulty,
        "tags": doc.tags,
        "content_hash": doc.content_hash(),
    })
}

async fn index_one(
    semantic: &SemanticIndex,
    doc: &Document,
    max_input_chars: usize,
) -> casebook_core::Result<()> {
    let vector = semantic
        .embedder
        .embed(&doc.embedding_text(max_input_chars))
        .await?;
    semantic
        .index
        .upsert(&doc.id, &vector, index_metadata(doc))
        .await
}

/// Embed and upsert every document in `store`.
///
/// Only a failing `reset` aborts the run; per-document failures are
/// counted in the report.
pub async fn rebuild_index(
    store: &dyn DocumentStore,
    semantic: &SemanticIndex,
    options: &ReindexOptions,
) -> Result<ReindexReport> {
    let start = Instant::now();

    if options.reset {
        semantic
            .index
            .reset()
            .await
            .context("Failed to reset vector index")?;
        info!(backend = semantic.index.backend(), "vector index reset");
    }

    let docs: Vec<Arc<Document>> = store.get_all();
    let batch_size = options.batch_size.max(1);
    let batch_count = docs.len().div_ceil(batch_size);
    let mut report = ReindexReport::default();

    for (batch_no, batch) in docs.chunks(batch_size).enumerate() {
        let outcomes = join_all(
            batch
                .iter()
                .map(|doc| index_one(semantic, doc, options.max_input_chars)),
        )
        .await;

        for (doc, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "failed to index case");
                    report.failed += 1;
                }
            }
        }

        info!(
            batch = batch_no + 1,
            of = batch_count,
            indexed = report.indexed,
            failed = report.failed,
            "indexed batch"
        );

        if batch_no + 1 < batch_count && !options.batch_pause.is_zero() {
            tokio::time::sleep(options.batch_pause).await;
        }
    }

    info!(
        indexed = report.indexed,
        failed = report.failed,
        model = semantic.embedder.model_name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "reindex complete"
    );
    Ok(report)
}
