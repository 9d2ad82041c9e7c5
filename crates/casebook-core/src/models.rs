//! Core data models: case documents, search options, and search results.

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CaseError, Result};

/// Smallest accepted `limit` for a search.
pub const MIN_LIMIT: usize = 1;
/// Largest accepted `limit` for a search.
pub const MAX_LIMIT: usize = 20;
/// `limit` used when the caller does not supply one.
pub const DEFAULT_LIMIT: usize = 5;

/// Top-level grouping of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Mobile,
    Web,
    Backend,
    Tools,
    Integrations,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Mobile,
        Category::Web,
        Category::Backend,
        Category::Tools,
        Category::Integrations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mobile => "mobile",
            Category::Web => "web",
            Category::Backend => "backend",
            Category::Tools => "tools",
            Category::Integrations => "integrations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                CaseError::validation(
                    "category",
                    format!(
                        "unknown category '{}'; expected one of: mobile, web, backend, tools, integrations",
                        s
                    ),
                )
            })
    }
}

/// How much prior experience a case assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| {
                CaseError::validation(
                    "difficulty",
                    format!(
                        "unknown difficulty '{}'; expected one of: beginner, intermediate, advanced",
                        s
                    ),
                )
            })
    }
}

/// A parsed case document.
///
/// Owned by the document store; everything downstream only reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Unique, stable key taken from the frontmatter.
    pub id: String,
    pub title: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub last_updated: NaiveDate,
    pub tested_versions: Option<BTreeMap<String, String>>,
    pub estimated_time: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    /// Markdown body following the frontmatter block.
    pub content: String,
    /// Path of the file the document was loaded from, relative to the case root.
    pub source_path: String,
}

impl Document {
    /// Hex SHA-256 of the markdown body.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Text handed to the embedder: title, tags and body, cut to at most
    /// `max_chars` characters.
    pub fn embedding_text(&self, max_chars: usize) -> String {
        let text = format!("{}\n{}\n\n{}", self.title, self.tags.join(", "), self.content);
        match text.char_indices().nth(max_chars) {
            Some((byte_pos, _)) => text[..byte_pos].to_string(),
            None => text,
        }
    }
}

/// A ranked search hit. Built fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub relevance_score: f64,
    pub excerpt: String,
}

/// A single nearest-neighbor hit returned by a [`VectorIndex`](crate::index::VectorIndex).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f64,
    pub metadata: serde_json::Value,
}

/// Filters and limit for one search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    /// Maximum number of results; always within `MIN_LIMIT..=MAX_LIMIT`
    /// when built through [`SearchOptions::parse`].
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            category: None,
            difficulty: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchOptions {
    /// Validate raw caller parameters into search options.
    ///
    /// Rejects unknown categories and difficulties and limits outside
    /// `1..=20`. A missing limit becomes [`DEFAULT_LIMIT`].
    pub fn parse(
        category: Option<&str>,
        difficulty: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Self> {
        let category = category.map(str::parse::<Category>).transpose()?;
        let difficulty = difficulty.map(str::parse::<Difficulty>).transpose()?;
        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(l) if l >= MIN_LIMIT as i64 && l <= MAX_LIMIT as i64 => l as usize,
            Some(l) => {
                return Err(CaseError::validation(
                    "limit",
                    format!("{} is out of range; must be between {} and {}", l, MIN_LIMIT, MAX_LIMIT),
                ))
            }
        };
        Ok(Self {
            category,
            difficulty,
            limit,
        })
    }

    /// True when `doc` passes both the category and difficulty filters.
    pub fn matches(&self, doc: &Document) -> bool {
        self.category.map_or(true, |c| doc.category == c)
            && self.difficulty.map_or(true, |d| doc.difficulty == d)
    }
}
