//! Tool trait, built-in case tools and the tool registry.
//!
//! Every query operation is a [`Tool`]: a name, a description, a JSON
//! Schema for its parameters and an async `execute`. The HTTP server
//! dispatches `POST /tools/{name}` through a [`ToolRegistry`] and the MCP
//! bridge exposes the same registry as MCP tools.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  search-cases   get-case   list-cases    │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     ToolContext → CaseService → SearchEngine
//! ```

use async_trait::async_trait;
use casebook_core::CaseError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::service::{CaseService, GetCaseParams, ListCasesParams, SearchCasesParams};

/// Failure of a tool call, classified for transport mapping.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Rejected before any work was done.
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CaseError> for ToolError {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::Validation { .. } => ToolError::InvalidParams(err.to_string()),
            other => ToolError::Internal(other.into()),
        }
    }
}

/// A callable operation exposed over HTTP and MCP.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`) and MCP tool name.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema (`type: "object"`) describing the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with the raw JSON parameters of the call.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Discovery entry returned by `GET /tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What a tool can reach while executing.
#[derive(Clone)]
pub struct ToolContext {
    service: Arc<CaseService>,
}

impl ToolContext {
    pub fn new(service: Arc<CaseService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &CaseService {
        &self.service
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(e.into()))
}

// ============ Built-in tools ============

pub struct SearchCasesTool;

#[async_trait]
impl Tool for SearchCasesTool {
    fn name(&self) -> &str {
        "search-cases"
    }

    fn description(&self) -> &str {
        "Search case studies by meaning and keywords, optionally filtered by category and difficulty"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What you are trying to build or fix" },
                "category": {
                    "type": "string",
                    "enum": ["mobile", "web", "backend", "tools", "integrations"]
                },
                "difficulty": {
                    "type": "string",
                    "enum": ["beginner", "intermediate", "advanced"]
                },
                "limit": { "type": "integer", "minimum": 1, "maximum": 20, "default": 5 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let params: SearchCasesParams = parse_params(params)?;
        let response = ctx.service().search_cases(&params).await?;
        to_json(&response)
    }
}

pub struct GetCaseTool;

#[async_trait]
impl Tool for GetCaseTool {
    fn name(&self) -> &str {
        "get-case"
    }

    fn description(&self) -> &str {
        "Fetch a full case study by id, optionally limited to named sections"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Case id from search-cases" },
                "sections": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Header names to keep, e.g. [\"installation\", \"troubleshooting\"]"
                },
                "maxTokens": { "type": "integer", "minimum": 500, "maximum": 16000, "default": 8000 }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let params: GetCaseParams = parse_params(params)?;
        let case = ctx.service().get_case(&params)?;
        to_json(&case)
    }
}

pub struct ListCasesTool;

#[async_trait]
impl Tool for ListCasesTool {
    fn name(&self) -> &str {
        "list-cases"
    }

    fn description(&self) -> &str {
        "List case studies, optionally by category or tag"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["mobile", "web", "backend", "tools", "integrations"]
                },
                "tag": { "type": "string", "description": "Substring of a tag, case-insensitive" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let params: ListCasesParams = parse_params(params)?;
        let list = ctx.service().list_cases(&params)?;
        to_json(&list)
    }
}

// ============ Registry ============

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// A registry holding `search-cases`, `get-case` and `list-cases`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchCasesTool));
        registry.register(Box::new(GetCaseTool));
        registry.register(Box::new(ListCasesTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::service;

    fn context() -> (tempfile::TempDir, ToolContext) {
        let (tmp, svc) = service();
        (tmp, ToolContext::new(Arc::new(svc)))
    }

    #[test]
    fn test_registry_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert!(registry.find("search-cases").is_some());
        assert!(registry.find("get-case").is_some());
        assert!(registry.find("list-cases").is_some());
        assert!(registry.find("search").is_none());
        for info in registry.infos() {
            assert_eq!(info.parameters["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_search_tool_response_shape() {
        let (_tmp, ctx) = context();
        let out = SearchCasesTool
            .execute(json!({"query": "stripe checkout", "limit": 3}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["query"], "stripe checkout");
        assert_eq!(out["total_results"], 1);
        assert_eq!(out["cases"][0]["id"], "stripe-checkout");
        assert_eq!(out["cases"][0]["category"], "web");
        assert!(out["cases"][0]["relevance_score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_wrongly_typed_params_are_invalid() {
        let (_tmp, ctx) = context();
        let err = SearchCasesTool
            .execute(json!({"query": "x", "limit": "ten"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));

        let err = GetCaseTool.execute(Value::Null, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_get_tool_accepts_camel_case_max_tokens() {
        let (_tmp, ctx) = context();
        let out = GetCaseTool
            .execute(
                json!({"id": "stripe-checkout", "sections": ["install"], "maxTokens": 500}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out["content"], "## Install\n\nnpm install stripe");
        assert_eq!(out["last_updated"], "2024-03-10");
        assert_eq!(out["truncated"], false);

        let err = GetCaseTool
            .execute(json!({"id": "stripe-checkout", "maxTokens": 20000}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maxTokens"));
    }

    #[tokio::test]
    async fn test_get_tool_not_found() {
        let (_tmp, ctx) = context();
        let err = GetCaseTool
            .execute(json!({"id": "nonexistent"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_tool() {
        let (_tmp, ctx) = context();
        let out = ListCasesTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(out["total"], 2);
        let out = ListCasesTool
            .execute(json!({"category": "backend"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["cases"][0]["id"], "supabase-auth");
        assert_eq!(out["cases"][0]["difficulty"], "beginner");
    }

    #[test]
    fn test_case_error_mapping() {
        let err: ToolError = CaseError::validation("limit", "bad").into();
        assert!(matches!(err, ToolError::InvalidParams(_)));
        let err: ToolError = CaseError::parse("a.md", "bad").into();
        assert!(matches!(err, ToolError::Internal(_)));
    }
}
