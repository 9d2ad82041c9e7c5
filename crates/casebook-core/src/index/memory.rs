//! In-memory [`VectorIndex`] implementation for testing and local runs.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety.
//! Queries are brute-force cosine similarity over all stored vectors.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::VectorHit;

use super::VectorIndex;

struct StoredVector {
    vector: Vec<f32>,
    metadata: serde_json::Value,
}

/// In-memory nearest-neighbor index.
pub struct InMemoryIndex {
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, id: &str, vector: &[f32], metadata: serde_json::Value) -> Result<()> {
        let mut vectors = self.vectors.write().unwrap_or_else(PoisonError::into_inner);
        vectors.insert(
            id.to_string(),
            StoredVector {
                vector: vector.to_vec(),
                metadata,
            },
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>> {
        let vectors = self.vectors.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<VectorHit> = vectors
            .iter()
            .map(|(id, sv)| VectorHit {
                id: id.clone(),
                score: cosine_similarity(vector, &sv.vector) as f64,
                metadata: sv.metadata.clone(),
            })
            .collect();
        // id as tie-breaker keeps HashMap iteration order out of the output
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.vectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.vectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
