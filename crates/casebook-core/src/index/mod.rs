//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the capability the ranking engine and the
//! bulk re-indexer need from a nearest-neighbor index. The in-memory
//! implementation in [`memory`] backs tests and local runs; the app crate
//! provides a REST-backed implementation for a hosted index.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::VectorHit;

/// A nearest-neighbor index keyed by case id.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace the vector for an id |
/// | [`query`](VectorIndex::query) | Top-k most similar vectors, best first |
/// | [`delete`](VectorIndex::delete) | Remove an id (no-op if absent) |
/// | [`reset`](VectorIndex::reset) | Remove everything |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend label used in logs and errors (e.g. `"memory"`).
    fn backend(&self) -> &str;

    async fn upsert(&self, id: &str, vector: &[f32], metadata: serde_json::Value) -> Result<()>;

    /// Returns at most `top_k` hits ordered by descending score.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn reset(&self) -> Result<()>;
}
