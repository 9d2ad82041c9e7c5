//! HTTP server exposing the case tools as JSON endpoints and over MCP.
//!
//! Every tool in the [`ToolRegistry`] is dispatched through the same
//! `POST /tools/{name}` handler. The same registry is mounted at `/mcp`
//! as an MCP Streamable HTTP endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version and loaded case count |
//! | `GET`  | `/tools/list` | Registered tools with parameter schemas |
//! | `POST` | `/tools/{name}` | Call a tool; success is `{"result": ...}` |
//! | `POST` | `/reload` | Re-read the case directory |
//! | `*`    | `/mcp` | MCP JSON-RPC (Streamable HTTP) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::mcp::McpBridge;
use crate::reindex::ReindexReport;
use crate::service::CaseService;
use crate::tools::{ToolContext, ToolError, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    service: Arc<CaseService>,
    tools: Arc<ToolRegistry>,
}

/// Load cases, build the index if needed, and serve until shutdown.
///
/// An in-memory vector index is always built at startup. `reindex`
/// additionally forces a full reset and rebuild of a persistent index.
pub async fn run_server(config: &Config, reindex: bool) -> anyhow::Result<()> {
    let service = Arc::new(CaseService::from_config(config)?);

    if service.has_ephemeral_index() || (reindex && service.semantic().is_some()) {
        let report = service.rebuild_index(reindex).await?;
        info!(indexed = report.indexed, failed = report.failed, "startup indexing done");
    } else if reindex {
        warn!("--reindex ignored: embeddings are disabled");
    }

    let tools = Arc::new(ToolRegistry::with_builtins());
    let app = router(service, tools);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Build the application router over a loaded service.
pub fn router(service: Arc<CaseService>, tools: Arc<ToolRegistry>) -> Router {
    let bridge = McpBridge::new(ToolContext::new(service.clone()), tools.clone());
    let mcp = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/reload", post(handle_reload))
        .nest_service("/mcp", mcp)
        .layer(cors)
        .with_state(AppState { service, tools })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::InvalidParams(msg) => bad_request(msg),
            ToolError::NotFound(msg) => not_found(msg),
            ToolError::Internal(e) => tool_error(format!("{:#}", e)),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.service.document_count(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let ctx = ToolContext::new(state.service.clone());
    let result = tool.execute(params, &ctx).await.map_err(|e| {
        if matches!(e, ToolError::Internal(_)) {
            warn!(tool = %name, error = %e, "tool call failed");
        }
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({ "result": result })))
}

// ============ POST /reload ============

#[derive(Serialize)]
struct ReloadResponse {
    documents: usize,
    skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    indexed: Option<ReindexReport>,
}

async fn handle_reload(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = state.service.clone();
    let report = tokio::task::spawn_blocking(move || service.reload())
        .await
        .map_err(|e| tool_error(e.to_string()))?
        .map_err(|e| tool_error(format!("{:#}", e)))?;

    let indexed = if state.service.has_ephemeral_index() {
        Some(
            state
                .service
                .rebuild_index(true)
                .await
                .map_err(|e| tool_error(format!("{:#}", e)))?,
        )
    } else {
        None
    };

    let response = ReloadResponse {
        documents: report.documents,
        skipped: report.skipped,
        indexed,
    };
    Ok(Json(serde_json::json!({ "result": response })))
}
