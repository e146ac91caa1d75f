//! HTTP implementation of the core [`Backend`] trait.
//!
//! Every request carries `Authorization: Bearer <key>`. Responses are
//! classified as follows:
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx with a JSON body | `Ok(body)` |
//! | 2xx with an empty body | `Ok(null)` |
//! | 401 | [`RelayError::Auth`] |
//! | other non-2xx | [`RelayError::Backend`] with the decoded message |
//! | no response / unreadable body | [`RelayError::Transport`] |
//!
//! Timeouts come from `[backend].timeout_secs` and surface as transport
//! errors, which the fallback chains treat like any other failure.

use async_trait::async_trait;
use content_relay_core::backend::Backend;
use content_relay_core::models::ContentFlag;
use content_relay_core::wire::{
    LegacySearchRequest, LegacySynthesisRequest, ModernSearchRequest, ModernSynthesisRequest,
};
use content_relay_core::{RelayError, RelayResult};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> RelayResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            RelayError::Auth(format!(
                "no API key configured; set {} or backend.api_key",
                config.api_key_env
            ))
        })?;
        Self::new(
            &config.base_url,
            &api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/content/{id}` plus optional trailing segments. The id is
    /// percent-encoded as a single segment so it cannot change the path
    /// or add a query.
    fn content_url(&self, id: &str, tail: &[&str]) -> RelayResult<Url> {
        let id = id.trim();
        if id.is_empty() || id == "." || id == ".." {
            return Err(RelayError::InvalidRequest(format!(
                "invalid content id: {:?}",
                id
            )));
        }
        let mut url = Url::parse(&self.url("/api/content"))
            .map_err(|e| RelayError::InvalidRequest(format!("invalid backend URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidRequest("backend URL cannot carry a path".into()))?
            .push(id)
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> RelayResult<Value> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "backend response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(RelayError::Auth(
                decode_error_message(&body)
                    .unwrap_or_else(|| "invalid or expired API key".to_string()),
            ));
        }
        if !status.is_success() {
            let message = decode_error_message(&body).unwrap_or_else(|| {
                format!(
                    "request failed ({})",
                    status.canonical_reason().unwrap_or("unknown status")
                )
            });
            return Err(RelayError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RelayError::Transport(format!("response body is not JSON: {}", e)))
    }
}

/// Pull a human-readable message out of an error body, if there is one.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}`,
/// `{"message": "..."}`, and short plain-text bodies.
pub fn decode_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => {
            let candidates = [
                v.get("error").and_then(Value::as_str),
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str),
                v.get("message").and_then(Value::as_str),
                v.get("detail").and_then(Value::as_str),
            ];
            candidates
                .into_iter()
                .flatten()
                .find(|s| !s.trim().is_empty())
                .map(str::to_string)
        }
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => Some(trimmed.to_string()),
        Err(_) => None,
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn verify_auth(&self) -> RelayResult<Value> {
        self.send(self.client.get(self.url("/api/auth/verify")))
            .await
    }

    async fn search(&self, request: &ModernSearchRequest) -> RelayResult<Value> {
        self.send(self.client.post(self.url("/api/v2/search")).json(request))
            .await
    }

    async fn legacy_search(&self, request: &LegacySearchRequest) -> RelayResult<Value> {
        self.send(
            self.client
                .get(self.url("/api/search"))
                .query(&request.query_pairs()),
        )
        .await
    }

    async fn get_content(&self, id: &str) -> RelayResult<Value> {
        self.send(self.client.get(self.content_url(id, &[])?)).await
    }

    async fn list_recent(&self, limit: usize) -> RelayResult<Value> {
        self.send(
            self.client
                .get(self.url("/api/content"))
                .query(&[("limit", limit.to_string()), ("sort", "recent".to_string())]),
        )
        .await
    }

    async fn synthesize(&self, request: &ModernSynthesisRequest) -> RelayResult<Value> {
        self.send(self.client.post(self.url("/api/v2/synthesis")).json(request))
            .await
    }

    async fn legacy_synthesize(&self, request: &LegacySynthesisRequest) -> RelayResult<Value> {
        self.send(self.client.post(self.url("/api/synthesize")).json(request))
            .await
    }

    async fn update_tags(&self, id: &str, tags: &[String]) -> RelayResult<Value> {
        self.send(
            self.client
                .put(self.content_url(id, &["tags"])?)
                .json(&json!({ "tags": tags })),
        )
        .await
    }

    async fn set_flag(&self, id: &str, flag: ContentFlag, value: bool) -> RelayResult<Value> {
        let mut body = Map::new();
        body.insert(flag.wire_field().to_string(), Value::Bool(value));
        self.send(
            self.client
                .patch(self.content_url(id, &[])?)
                .json(&Value::Object(body)),
        )
        .await
    }

    async fn save_url(&self, url: &str, tags: &[String]) -> RelayResult<Value> {
        self.send(
            self.client
                .post(self.url("/api/content"))
                .json(&json!({ "url": url, "tags": tags })),
        )
        .await
    }
}
