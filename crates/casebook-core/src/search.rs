//! Hybrid ranking engine.
//!
//! The engine works entirely through the [`DocumentStore`], [`Embedder`]
//! and [`VectorIndex`] traits. Validation of caller parameters happens
//! before it is invoked (see [`SearchOptions::parse`]).
//!
//! # Algorithm
//!
//! 1. Embed the query and fetch `2 × limit` nearest neighbors.
//! 2. Filter the full document set by category and difficulty → `F`.
//! 3. Vector hits whose id is in `F` become results scored with the raw
//!    similarity; the first hit for an id wins.
//! 4. Documents of `F` not matched yet are keyword-scored. Positive scores
//!    are added in descending keyword order while fewer than `limit`
//!    results are held.
//! 5. All results are stable-sorted by score (desc) and cut to `limit`.
//!
//! Any embedding or index failure turns the whole search into an empty
//! result list.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::error::Result;
use crate::excerpt::{excerpt, DEFAULT_EXCERPT_CHARS};
use crate::index::VectorIndex;
use crate::keyword::{query_tokens, score_tokens};
use crate::models::{Document, SearchOptions, SearchResult, VectorHit};
use crate::store::DocumentStore;

/// How vector and keyword scores are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Raw similarity and raw keyword points share one scale.
    #[default]
    Raw,
    /// Each channel is min-max normalized to `[0, 1]` before merging.
    Normalized,
}

/// An embedder paired with the index its vectors live in.
#[derive(Clone)]
pub struct SemanticIndex {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

impl SemanticIndex {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `query` and return its `top_k` nearest neighbors.
    pub async fn nearest(&self, query: &str, top_k: usize) -> Result<Vec<VectorHit>> {
        let vector = self.embedder.embed_query(query).await?;
        self.index.query(&vector, top_k).await
    }
}

/// Hybrid search over a document store.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn DocumentStore>,
    semantic: Option<SemanticIndex>,
    score_mode: ScoreMode,
}

impl SearchEngine {
    /// A keyword-only engine over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            semantic: None,
            score_mode: ScoreMode::Raw,
        }
    }

    /// Enable the vector channel.
    pub fn with_semantic(mut self, semantic: SemanticIndex) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_score_mode(mut self, score_mode: ScoreMode) -> Self {
        self.score_mode = score_mode;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn semantic(&self) -> Option<&SemanticIndex> {
        self.semantic.as_ref()
    }

    /// Run one search. Never fails: adapter faults yield an empty list.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let hits = match &self.semantic {
            Some(semantic) => match semantic.nearest(query, options.limit * 2).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(error = %e, "vector search failed, returning no results");
                    return Vec::new();
                }
            },
            None => Vec::new(),
        };

        let candidates: Vec<Arc<Document>> = self
            .store
            .get_all()
            .into_iter()
            .filter(|d| options.matches(d))
            .collect();

        let results = rank(query, &hits, &candidates, options.limit, self.score_mode);
        debug!(
            query,
            vector_hits = hits.len(),
            candidates = candidates.len(),
            results = results.len(),
            "search complete"
        );
        results
    }
}

/// Merge vector hits and keyword matches over `candidates` into at most
/// `limit` results.
///
/// `candidates` must already be filtered; hits for ids outside it are
/// dropped.
pub fn rank(
    query: &str,
    hits: &[VectorHit],
    candidates: &[Arc<Document>],
    limit: usize,
    score_mode: ScoreMode,
) -> Vec<SearchResult> {
    let by_id: HashMap<&str, &Document> = candidates
        .iter()
        .map(|d| (d.id.as_str(), d.as_ref()))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut vector_matches: Vec<(&Document, f64)> = Vec::new();
    for hit in hits {
        if let Some(doc) = by_id.get(hit.id.as_str()) {
            if seen.insert(doc.id.as_str()) {
                vector_matches.push((doc, hit.score));
            }
        }
    }

    let tokens = query_tokens(query);
    let mut keyword_matches: Vec<(&Document, f64)> = candidates
        .iter()
        .filter(|d| !seen.contains(d.id.as_str()))
        .map(|d| (d.as_ref(), score_tokens(&tokens, d)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    sort_desc(&mut keyword_matches, |(_, s)| *s);

    if score_mode == ScoreMode::Normalized {
        normalize_in_place(&mut vector_matches);
        normalize_in_place(&mut keyword_matches);
    }

    let mut results: Vec<SearchResult> = vector_matches
        .into_iter()
        .map(|(doc, score)| to_result(doc, score, query))
        .collect();

    for (doc, score) in keyword_matches {
        if results.len() >= limit {
            break;
        }
        results.push(to_result(doc, score, query));
    }

    sort_desc(&mut results, |r| r.relevance_score);
    results.truncate(limit);
    results
}

fn to_result(doc: &Document, score: f64, query: &str) -> SearchResult {
    SearchResult {
        id: doc.id.clone(),
        title: doc.title.clone(),
        category: doc.category,
        tags: doc.tags.clone(),
        relevance_score: score,
        excerpt: excerpt(&doc.content, query, DEFAULT_EXCERPT_CHARS),
    }
}

/// Stable descending sort by a float key.
fn sort_desc<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Min-max normalize raw scores to `[0.0, 1.0]`.
///
/// If all scores are equal, they are normalized to `1.0`.
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let s_min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let s_max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    scores
        .iter()
        .map(|s| {
            if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (s - s_min) / (s_max - s_min)
            }
        })
        .collect()
}

fn normalize_in_place(matches: &mut [(&Document, f64)]) {
    let raw: Vec<f64> = matches.iter().map(|(_, s)| *s).collect();
    for ((_, score), norm) in matches.iter_mut().zip(normalize_scores(&raw)) {
        *score = norm;
    }
}
