//! HTTP embedding providers.
//!
//! Implements [`casebook_core::Embedder`] for:
//! - **[`OpenAIEmbedder`]**: `POST https://api.openai.com/v1/embeddings`
//! - **[`OllamaEmbedder`]**: `POST {url}/api/embed` on a local Ollama
//!
//! Use [`create_embedder`] to build the provider named in the config. The
//! `disabled` provider yields `None`, which runs search keyword-only.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Bulk indexing retries up to `max_retries`. Search-time query embeddings
//! use `query_max_retries` so a failing provider degrades search quickly.

use anyhow::{bail, Result};
use async_trait::async_trait;
use casebook_core::{CaseError, Embedder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

const OPENAI_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedder named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown providers, missing `model`/`dims`, or a
/// missing `OPENAI_API_KEY` when the OpenAI provider is selected.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => Ok(Some(Arc::new(OpenAIEmbedder::new(config)?))),
        "ollama" => Ok(Some(Arc::new(OllamaEmbedder::new(config)?))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

fn model_and_dims(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", provider))?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {} provider", provider))?;
    Ok((model, dims))
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

fn embedding_error(provider: &str, message: impl Into<String>) -> CaseError {
    CaseError::Embedding {
        provider: provider.to_string(),
        message: message.into(),
    }
}

/// Send a JSON request with exponential backoff and return the response body.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`.
async fn send_with_retry(
    provider: &str,
    max_retries: u32,
    build: impl Fn() -> reqwest::RequestBuilder,
) -> casebook_core::Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| embedding_error(provider, format!("invalid response body: {}", e)));
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(embedding_error(
                        provider,
                        format!("API error {}: {}", status, body_text),
                    ));
                    continue;
                }

                return Err(embedding_error(
                    provider,
                    format!("API error {}: {}", status, body_text),
                ));
            }
            Err(e) => {
                last_err = Some(embedding_error(provider, format!("request failed: {}", e)));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| embedding_error(provider, "embedding failed after retries")))
}

fn check_dims(provider: &str, vector: Vec<f32>, dims: usize) -> casebook_core::Result<Vec<f32>> {
    if vector.len() != dims {
        return Err(embedding_error(
            provider,
            format!("expected {} dimensions, got {}", dims, vector.len()),
        ));
    }
    Ok(vector)
}

fn json_to_vector(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

// ============ OpenAI ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
    query_max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "openai")?;
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("OPENAI_API_KEY environment variable not set"),
        };

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model,
            dims,
            max_retries: config.max_retries,
            query_max_retries: config.query_max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> casebook_core::Result<Vec<f32>> {
        self.request(text, self.max_retries).await
    }

    async fn embed_query(&self, query: &str) -> casebook_core::Result<Vec<f32>> {
        self.request(query, self.query_max_retries).await
    }
}

impl OpenAIEmbedder {
    async fn request(&self, text: &str, max_retries: u32) -> casebook_core::Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let json = send_with_retry("openai", max_retries, || {
            self.client
                .post(OPENAI_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        check_dims("openai", parse_openai_response(&json)?, self.dims)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> casebook_core::Result<Vec<f32>> {
    json.get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .map(|values| json_to_vector(values))
        .ok_or_else(|| embedding_error("openai", "invalid response: missing data[0].embedding"))
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with the model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    max_retries: u32,
    query_max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "ollama")?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url,
            model,
            dims,
            max_retries: config.max_retries,
            query_max_retries: config.query_max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> casebook_core::Result<Vec<f32>> {
        self.request(text, self.max_retries).await
    }

    async fn embed_query(&self, query: &str) -> casebook_core::Result<Vec<f32>> {
        self.request(query, self.query_max_retries).await
    }
}

impl OllamaEmbedder {
    async fn request(&self, text: &str, max_retries: u32) -> casebook_core::Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let endpoint = format!("{}/api/embed", self.url);

        let json = send_with_retry("ollama", max_retries, || {
            self.client.post(&endpoint).json(&body)
        })
        .await?;

        check_dims("ollama", parse_ollama_response(&json)?, self.dims)
    }
}

/// Extract `embeddings[0]` from an Ollama `/api/embed` response.
fn parse_ollama_response(json: &serde_json::Value) -> casebook_core::Result<Vec<f32>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(|e| e.as_array())
        .map(|values| json_to_vector(values))
        .ok_or_else(|| embedding_error("ollama", "invalid response: missing embeddings[0]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_disabled_provider_yields_none() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert!(embedder.is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let cfg = EmbeddingConfig {
            provider: "magic".to_string(),
            ..Default::default()
        };
        assert!(create_embedder(&cfg).is_err());
    }

    #[test]
    fn test_ollama_requires_model() {
        let cfg = EmbeddingConfig {
            provider: "ollama".to_string(),
            dims: Some(4),
            ..Default::default()
        };
        let err = create_embedder(&cfg).err().unwrap().to_string();
        assert!(err.contains("embedding.model"), "{}", err);
    }

    #[test]
    fn test_ollama_url_trailing_slash_trimmed() {
        let cfg = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(768),
            url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&cfg).unwrap();
        assert_eq!(embedder.url, "http://gpu-box:11434");
        assert_eq!(embedder.dims(), 768);
    }

    #[test]
    fn test_parse_openai_response() {
        let body = json!({ "data": [ { "index": 0, "embedding": [0.5, -1.0, 2.0] } ] });
        assert_eq!(parse_openai_response(&body).unwrap(), vec![0.5, -1.0, 2.0]);
        assert!(parse_openai_response(&json!({ "data": [] })).is_err());
        assert!(parse_openai_response(&json!({})).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let body = json!({ "model": "m", "embeddings": [[0.25, 0.75]] });
        assert_eq!(parse_ollama_response(&body).unwrap(), vec![0.25, 0.75]);
        assert!(parse_ollama_response(&json!({ "embeddings": "nope" })).is_err());
    }

    async fn start_failing_ollama() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/embed",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "model loading")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_query_embedding_uses_its_own_retry_budget() {
        let (url, hits) = start_failing_ollama().await;
        let cfg = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(4),
            url: Some(url),
            max_retries: 1,
            query_max_retries: 0,
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&cfg).unwrap();

        let err = embedder.embed_query("stripe checkout").await.unwrap_err();
        assert!(err.is_adapter_error());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        hits.store(0, Ordering::SeqCst);
        assert!(embedder.embed("stripe checkout").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_query_retry_default_is_small() {
        let cfg = EmbeddingConfig::default();
        assert_eq!(cfg.query_max_retries, 1);
        assert!(cfg.query_max_retries < cfg.max_retries);
    }

    #[test]
    fn test_dimension_mismatch_is_an_embedding_error() {
        let err = check_dims("openai", vec![1.0, 2.0], 3).unwrap_err();
        assert!(err.is_adapter_error());
        assert!(err.to_string().contains("expected 3 dimensions"));
    }
}
