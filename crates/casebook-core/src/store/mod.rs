//! Document store abstraction.
//!
//! The [`DocumentStore`] trait is the read surface the ranking engine and
//! the tool layer use. The store is never mutated while a query runs;
//! [`memory::InMemoryCaseStore`] swaps its whole contents atomically on
//! reload.

pub mod memory;

use std::sync::Arc;

use crate::models::{Category, Document};

/// Read-only access to loaded case documents.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_all`](DocumentStore::get_all) | Every document, in load order |
/// | [`get_by_id`](DocumentStore::get_by_id) | One document by id |
/// | [`get_by_category`](DocumentStore::get_by_category) | Documents in a category |
/// | [`get_by_tag`](DocumentStore::get_by_tag) | Documents with a tag containing a string |
pub trait DocumentStore: Send + Sync {
    fn get_all(&self) -> Vec<Arc<Document>>;

    fn get_by_id(&self, id: &str) -> Option<Arc<Document>>;

    fn get_by_category(&self, category: Category) -> Vec<Arc<Document>> {
        self.get_all()
            .into_iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Case-insensitive substring match against any tag.
    fn get_by_tag(&self, tag: &str) -> Vec<Arc<Document>> {
        let needle = tag.to_lowercase();
        self.get_all()
            .into_iter()
            .filter(|d| d.tags.iter().any(|t| t.to_lowercase().contains(&needle)))
            .collect()
    }

    fn len(&self) -> usize {
        self.get_all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
