//! REST-backed [`VectorIndex`] for a hosted nearest-neighbor service.
//!
//! Speaks the JSON protocol used by hosted vector databases such as Upstash
//! Vector. Every request carries `Authorization: Bearer <token>`; the token
//! is read from the environment variable named by `[index].token_env`.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upsert | `POST {url}/upsert` `[{id, vector, metadata}]` |
//! | query  | `POST {url}/query` `{vector, topK, includeMetadata}` → `{result: [{id, score, metadata}]}` |
//! | delete | `DELETE {url}/delete` `[id]` |
//! | reset  | `DELETE {url}/reset` |
//!
//! Any non-2xx status or a body carrying an `error` field becomes a
//! [`CaseError::Index`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use casebook_core::{CaseError, VectorHit, VectorIndex};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::IndexConfig;

const BACKEND: &str = "rest";

pub struct RestIndex {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct UpsertItem<'a> {
    id: &'a str,
    vector: &'a [f32],
    metadata: Value,
}

impl RestIndex {
    pub fn new(base_url: &str, token: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build from `[index]`, reading the token from the configured env var.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("index.url required for rest provider"))?;
        let token = match std::env::var(&config.token_env) {
            Ok(t) if !t.trim().is_empty() => t,
            _ => bail!("{} environment variable not set", config.token_env),
        };
        Self::new(url, token, config.timeout_secs)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> casebook_core::Result<Value> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| index_error(format!("request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or_else(|_| Value::Null);

        if !status.is_success() {
            return Err(index_error(format!("HTTP {}: {}", status, error_message(&body))));
        }
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(index_error(err.as_str().map_or_else(|| err.to_string(), String::from)));
        }
        Ok(body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn index_error(message: impl Into<String>) -> CaseError {
    CaseError::Index {
        backend: BACKEND.to_string(),
        message: message.into(),
    }
}

fn error_message(body: &Value) -> String {
    match body.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => body.to_string(),
    }
}

/// Parse the `result` array of a query response.
fn parse_query_response(body: &Value) -> casebook_core::Result<Vec<VectorHit>> {
    let items = body
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| index_error("invalid query response: missing result array"))?;

    items
        .iter()
        .map(|item| {
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| index_error("invalid query response: hit without id"))?;
            let score = item
                .get("score")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| index_error("invalid query response: hit without score"))?;
            Ok(VectorHit {
                id: id.to_string(),
                score,
                metadata: item.get("metadata").cloned().unwrap_or_else(|| json!({})),
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for RestIndex {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn upsert(&self, id: &str, vector: &[f32], metadata: Value) -> casebook_core::Result<()> {
        let items = [UpsertItem {
            id,
            vector,
            metadata,
        }];
        self.send(self.client.post(self.url("upsert")).json(&items))
            .await?;
        debug!(id, "upserted vector");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> casebook_core::Result<Vec<VectorHit>> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let response = self
            .send(self.client.post(self.url("query")).json(&body))
            .await?;
        let mut hits = parse_query_response(&response)?;
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, id: &str) -> casebook_core::Result<()> {
        self.send(self.client.delete(self.url("delete")).json(&[id]))
            .await?;
        Ok(())
    }

    async fn reset(&self) -> casebook_core::Result<()> {
        self.send(self.client.delete(self.url("reset"))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, post};
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    type Vectors = Arc<Mutex<BTreeMap<String, (Vec<f32>, Value)>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer secret")
    }

    async fn upsert(
        State(store): State<Vectors>,
        headers: HeaderMap,
        Json(items): Json<Vec<Value>>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})));
        }
        let mut store = store.lock().unwrap();
        for item in items {
            let vector: Vec<f32> = serde_json::from_value(item["vector"].clone()).unwrap();
            store.insert(
                item["id"].as_str().unwrap().to_string(),
                (vector, item["metadata"].clone()),
            );
        }
        (StatusCode::OK, Json(json!({"result": "Success"})))
    }

    async fn query(State(store): State<Vectors>, Json(body): Json<Value>) -> Json<Value> {
        let top_k = body["topK"].as_u64().unwrap() as usize;
        let store = store.lock().unwrap();
        // dot product is enough for the fixture vectors
        let query: Vec<f32> = serde_json::from_value(body["vector"].clone()).unwrap();
        let mut hits: Vec<Value> = store
            .iter()
            .map(|(id, (v, meta))| {
                let score: f32 = v.iter().zip(&query).map(|(a, b)| a * b).sum();
                json!({"id": id, "score": score, "metadata": meta})
            })
            .collect();
        hits.sort_by(|a, b| b["score"].as_f64().partial_cmp(&a["score"].as_f64()).unwrap());
        hits.truncate(top_k);
        Json(json!({ "result": hits }))
    }

    async fn remove(State(store): State<Vectors>, Json(ids): Json<Vec<String>>) -> Json<Value> {
        let mut store = store.lock().unwrap();
        let deleted = ids.iter().filter(|id| store.remove(*id).is_some()).count();
        Json(json!({"result": {"deleted": deleted}}))
    }

    async fn reset(State(store): State<Vectors>) -> Json<Value> {
        store.lock().unwrap().clear();
        Json(json!({"result": "Success"}))
    }

    async fn start_mock() -> String {
        let store: Vectors = Arc::new(Mutex::new(BTreeMap::new()));
        let app = Router::new()
            .route("/upsert", post(upsert))
            .route("/query", post(query))
            .route("/delete", delete(remove))
            .route("/reset", delete(reset))
            .with_state(store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_round_trip_against_mock_service() {
        let url = start_mock().await;
        let index = RestIndex::new(&url, "secret".to_string(), 5).unwrap();

        index.upsert("a", &[1.0, 0.0], json!({"title": "A"})).await.unwrap();
        index.upsert("b", &[0.0, 1.0], json!({"title": "B"})).await.unwrap();

        let hits = index.query(&[0.9, 0.1], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].metadata["title"], "A");

        index.delete("a").await.unwrap();
        let hits = index.query(&[0.9, 0.1], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");

        index.reset().await.unwrap();
        assert!(index.query(&[1.0, 1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_is_an_index_error() {
        let url = start_mock().await;
        let index = RestIndex::new(&url, "wrong".to_string(), 5).unwrap();
        let err = index.upsert("a", &[1.0], json!({})).await.unwrap_err();
        assert!(err.is_adapter_error());
        assert!(err.to_string().contains("Unauthorized"), "{}", err);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_index_error() {
        // port 9 (discard) is essentially never listening on loopback
        let index = RestIndex::new("http://127.0.0.1:9", "t".to_string(), 2).unwrap();
        assert!(index.query(&[1.0], 3).await.unwrap_err().is_adapter_error());
    }

    #[test]
    fn test_parse_query_response() {
        let body = json!({"result": [
            {"id": "x", "score": 0.8, "metadata": {"category": "web"}},
            {"id": "y", "score": 0.1}
        ]});
        let hits = parse_query_response(&body).unwrap();
        assert_eq!(hits[0].id, "x");
        assert_eq!(hits[1].metadata, json!({}));

        assert!(parse_query_response(&json!({"result": [{"score": 1.0}]})).is_err());
        assert!(parse_query_response(&json!({"error": "boom"})).is_err());
    }

    #[test]
    fn test_from_config_requires_token() {
        let cfg = IndexConfig {
            provider: "rest".to_string(),
            url: Some("http://localhost:1".to_string()),
            token_env: "CASEBOOK_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = RestIndex::from_config(&cfg).err().unwrap().to_string();
        assert!(err.contains("CASEBOOK_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }
}
