//! In-memory [`DocumentStore`] with atomic reload.
//!
//! The contents live in an immutable snapshot behind
//! `RwLock<Arc<Snapshot>>`. Readers clone the `Arc` and work on a
//! consistent view; [`InMemoryCaseStore::replace_all`] builds a fresh
//! snapshot off to the side and swaps the pointer, so no reader ever sees
//! a half-populated store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::models::Document;

use super::DocumentStore;

#[derive(Default)]
struct Snapshot {
    docs: Vec<Arc<Document>>,
    by_id: HashMap<String, usize>,
}

impl Snapshot {
    fn build(documents: Vec<Document>) -> Self {
        let mut snapshot = Snapshot::default();
        for doc in documents {
            match snapshot.by_id.get(&doc.id) {
                Some(&pos) => {
                    debug!(
                        id = %doc.id,
                        replaced = %snapshot.docs[pos].source_path,
                        by = %doc.source_path,
                        "duplicate case id, keeping the later document"
                    );
                    snapshot.docs[pos] = Arc::new(doc);
                }
                None => {
                    snapshot.by_id.insert(doc.id.clone(), snapshot.docs.len());
                    snapshot.docs.push(Arc::new(doc));
                }
            }
        }
        snapshot
    }
}

/// Process-local case store.
pub struct InMemoryCaseStore {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl InMemoryCaseStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// A store initialised with `documents`.
    ///
    /// A document whose id was already seen replaces the earlier one in
    /// place, keeping the earlier load position.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::build(documents))),
        }
    }

    /// Replace the whole contents of the store in one step.
    pub fn replace_all(&self, documents: Vec<Document>) {
        let fresh = Arc::new(Snapshot::build(documents));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryCaseStore {
    fn get_all(&self) -> Vec<Arc<Document>> {
        self.current().docs.clone()
    }

    fn get_by_id(&self, id: &str) -> Option<Arc<Document>> {
        let snapshot = self.current();
        snapshot.by_id.get(id).map(|&pos| snapshot.docs[pos].clone())
    }

    fn len(&self) -> usize {
        self.current().docs.len()
    }
}
