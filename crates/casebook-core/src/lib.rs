//! # Casebook Core
//!
//! Shared logic for Casebook: case models, frontmatter parsing, the
//! document store, the embedding and vector index traits, keyword
//! scoring, excerpt extraction, section filtering, and the hybrid
//! ranking engine.
//!
//! This crate performs no filesystem or network I/O. The application
//! crate walks the case directory, talks to embedding and vector index
//! services, and hands the results to the types defined here.

pub mod embedding;
pub mod error;
pub mod excerpt;
pub mod frontmatter;
pub mod index;
pub mod keyword;
pub mod models;
pub mod search;
pub mod sections;
pub mod store;

pub use error::{CaseError, Result};
pub use embedding::Embedder;
pub use index::VectorIndex;
pub use models::{Category, Difficulty, Document, SearchOptions, SearchResult, VectorHit};
pub use search::{ScoreMode, SearchEngine, SemanticIndex};
pub use store::DocumentStore;
