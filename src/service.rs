//! Case service: the operations exposed by the CLI, the HTTP API and MCP.
//!
//! A [`CaseService`] owns the loaded document store and the search engine
//! built over it. All three front ends call into the same methods here so
//! validation and response shapes stay identical everywhere.

use anyhow::{bail, Result};
use casebook_core::index::memory::InMemoryIndex;
use casebook_core::models::SearchOptions;
use casebook_core::sections::{
    filter_sections, truncate_to_tokens, DEFAULT_MAX_TOKENS, MAX_MAX_TOKENS, MIN_MAX_TOKENS,
};
use casebook_core::store::memory::InMemoryCaseStore;
use casebook_core::{
    Category, Difficulty, DocumentStore, SearchEngine, SemanticIndex, VectorIndex,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::index_rest::RestIndex;
use crate::loader::load_cases;
use crate::reindex::{rebuild_index, ReindexOptions, ReindexReport};
use crate::tools::ToolError;

// ============ Parameters ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCasesParams {
    #[serde(default)]
    pub query: String,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetCaseParams {
    #[serde(default)]
    pub id: String,
    pub sections: Option<Vec<String>>,
    #[serde(rename = "maxTokens", alias = "max_tokens")]
    pub max_tokens: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCasesParams {
    pub category: Option<String>,
    pub tag: Option<String>,
}

// ============ Responses ============

#[derive(Debug, Clone, Serialize)]
pub struct SearchCasesResponse {
    pub query: String,
    pub total_results: usize,
    pub cases: Vec<CaseHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseHit {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub tags: Vec<String>,
    /// Rounded to two decimals.
    pub relevance_score: f64,
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResponse {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub last_updated: NaiveDate,
    pub tested_versions: Option<BTreeMap<String, String>>,
    pub estimated_time: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    pub source_path: String,
    pub content: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListCasesResponse {
    pub total: usize,
    pub cases: Vec<CaseSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseSummary {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub documents: usize,
    pub skipped: usize,
}

fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

// ============ Service ============

pub struct CaseService {
    config: Config,
    store: Arc<InMemoryCaseStore>,
    engine: SearchEngine,
}

impl CaseService {
    pub fn new(config: Config, store: Arc<InMemoryCaseStore>, engine: SearchEngine) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }

    /// Load the case library and connect the configured providers.
    ///
    /// Missing credentials and unreadable case roots are fatal here.
    pub fn from_config(config: &Config) -> Result<Self> {
        let report = load_cases(&config.cases)?;
        let store = Arc::new(InMemoryCaseStore::from_documents(report.documents));

        let mut engine = SearchEngine::new(store.clone()).with_score_mode(config.search.score_mode);
        match build_semantic(config)? {
            Some(semantic) => {
                info!(
                    model = semantic.embedder.model_name(),
                    backend = semantic.index.backend(),
                    "semantic search enabled"
                );
                engine = engine.with_semantic(semantic);
            }
            None => info!("embeddings disabled, running keyword-only search"),
        }

        Ok(Self::new(config.clone(), store, engine))
    }

    /// Load the case library without connecting any provider.
    pub fn keyword_only(config: &Config) -> Result<Self> {
        let report = load_cases(&config.cases)?;
        let store = Arc::new(InMemoryCaseStore::from_documents(report.documents));
        let engine = SearchEngine::new(store.clone()).with_score_mode(config.search.score_mode);
        Ok(Self::new(config.clone(), store, engine))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<InMemoryCaseStore> {
        &self.store
    }

    pub fn semantic(&self) -> Option<&SemanticIndex> {
        self.engine.semantic()
    }

    /// True when vectors live only in this process and must be rebuilt
    /// after startup or reload.
    pub fn has_ephemeral_index(&self) -> bool {
        self.semantic()
            .is_some_and(|s| s.index.backend() == "memory")
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub async fn search_cases(
        &self,
        params: &SearchCasesParams,
    ) -> Result<SearchCasesResponse, ToolError> {
        if params.query.trim().is_empty() {
            return Err(ToolError::InvalidParams(
                "query must not be empty".to_string(),
            ));
        }
        let options = SearchOptions::parse(
            params.category.as_deref(),
            params.difficulty.as_deref(),
            params.limit.or(Some(self.config.search.default_limit)),
        )?;

        let cases: Vec<CaseHit> = self
            .engine
            .search(&params.query, &options)
            .await
            .into_iter()
            .map(|r| CaseHit {
                id: r.id,
                title: r.title,
                category: r.category,
                tags: r.tags,
                relevance_score: round2(r.relevance_score),
                excerpt: r.excerpt,
            })
            .collect();

        Ok(SearchCasesResponse {
            query: params.query.clone(),
            total_results: cases.len(),
            cases,
        })
    }

    pub fn get_case(&self, params: &GetCaseParams) -> Result<CaseResponse, ToolError> {
        let id = params.id.trim();
        if id.is_empty() {
            return Err(ToolError::InvalidParams("id must not be empty".to_string()));
        }

        let max_tokens = match params.max_tokens {
            None => DEFAULT_MAX_TOKENS,
            Some(t) if t >= MIN_MAX_TOKENS as i64 && t <= MAX_MAX_TOKENS as i64 => t as usize,
            Some(t) => {
                return Err(ToolError::InvalidParams(format!(
                    "maxTokens {} is out of range; must be between {} and {}",
                    t, MIN_MAX_TOKENS, MAX_MAX_TOKENS
                )))
            }
        };

        let doc = self
            .store
            .get_by_id(id)
            .ok_or_else(|| ToolError::NotFound(format!("case not found: {}", id)))?;

        let content = match params.sections.as_deref() {
            Some(names) if !names.is_empty() => {
                filter_sections(&doc.content, names).unwrap_or_else(|| doc.content.clone())
            }
            _ => doc.content.clone(),
        };
        let (content, truncated) = truncate_to_tokens(&content, max_tokens);

        Ok(CaseResponse {
            id: doc.id.clone(),
            title: doc.title.clone(),
            category: doc.category,
            difficulty: doc.difficulty,
            tags: doc.tags.clone(),
            last_updated: doc.last_updated,
            tested_versions: doc.tested_versions.clone(),
            estimated_time: doc.estimated_time.clone(),
            prerequisites: doc.prerequisites.clone(),
            source_path: doc.source_path.clone(),
            content,
            truncated,
        })
    }

    pub fn list_cases(&self, params: &ListCasesParams) -> Result<ListCasesResponse, ToolError> {
        let category = params
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;
        let tag = params
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let mut docs = match (category, tag) {
            (Some(c), _) => self.store.get_by_category(c),
            (None, Some(t)) => self.store.get_by_tag(t),
            (None, None) => self.store.get_all(),
        };
        if let (Some(_), Some(t)) = (category, tag) {
            let needle = t.to_lowercase();
            docs.retain(|d| d.tags.iter().any(|x| x.to_lowercase().contains(&needle)));
        }

        let cases: Vec<CaseSummary> = docs
            .iter()
            .map(|d| CaseSummary {
                id: d.id.clone(),
                title: d.title.clone(),
                category: d.category,
                difficulty: d.difficulty,
                tags: d.tags.clone(),
            })
            .collect();

        Ok(ListCasesResponse {
            total: cases.len(),
            cases,
        })
    }

    /// Re-read the case directory and swap the store contents in one step.
    pub fn reload(&self) -> Result<ReloadReport> {
        let report = load_cases(&self.config.cases)?;
        let documents = report.documents.len();
        let skipped = report.skipped.len();
        self.store.replace_all(report.documents);
        info!(documents, skipped, "case store reloaded");
        Ok(ReloadReport { documents, skipped })
    }

    pub async fn rebuild_index(&self, reset: bool) -> Result<ReindexReport> {
        let Some(semantic) = self.semantic() else {
            bail!("embeddings are disabled; set [embedding].provider to index cases");
        };
        let mut options = ReindexOptions::from_config(&self.config);
        options.reset = reset;
        rebuild_index(self.store.as_ref(), semantic, &options).await
    }

    pub async fn delete_from_index(&self, id: &str) -> Result<()> {
        let Some(semantic) = self.semantic() else {
            bail!("embeddings are disabled; there is no vector index to delete from");
        };
        semantic.index.delete(id).await?;
        if self.store.get_by_id(id).is_some() {
            warn!(id, "deleted vector for a case that is still loaded");
        }
        Ok(())
    }
}

fn build_semantic(config: &Config) -> Result<Option<SemanticIndex>> {
    let Some(embedder) = create_embedder(&config.embedding)? else {
        if config.index.provider != "memory" {
            warn!(
                provider = %config.index.provider,
                "index provider configured but embeddings are disabled; ignoring it"
            );
        }
        return Ok(None);
    };

    let index: Arc<dyn VectorIndex> = match config.index.provider.as_str() {
        "rest" => Arc::new(RestIndex::from_config(&config.index)?),
        "memory" => Arc::new(InMemoryIndex::new()),
        other => bail!("Unknown index provider: {}", other),
    };

    Ok(Some(SemanticIndex::new(embedder, index)))
}
