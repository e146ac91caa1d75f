//! End-to-end tests for the tool server.
//!
//! A small axum app stands in for the remote content service. The relay's
//! real HTTP client and router run against it, and every request is driven
//! over the network with reqwest, the same way a tool host would.

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use content_relay::client::HttpBackend;
use content_relay::config::{load_config, Config};
use content_relay::server::{build_router, serve};
use content_relay::traits::{ToolContext, ToolRegistry};
use content_relay_core::backend::Backend;
use content_relay_core::models::ContentFlag;
use content_relay_core::RelayError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const TEST_KEY: &str = "test-key";

// ─── Fake content service ───────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeService {
    hits: Arc<Mutex<Vec<String>>>,
    /// Legacy search answers with no records.
    search_empty: bool,
}

impl FakeService {
    fn hit(&self, line: impl Into<String>) {
        self.hits.lock().unwrap().push(line.into());
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn fake_verify(State(s): State<FakeService>, headers: HeaderMap) -> Response {
    s.hit("GET /api/auth/verify");
    let bearer = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let expected = format!("Bearer {}", TEST_KEY);
    if bearer == Some(expected.as_str()) {
        Json(json!({"valid": true, "user": {"id": "u1"}})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid api key"})),
        )
            .into_response()
    }
}

async fn fake_modern_search(State(s): State<FakeService>) -> Response {
    s.hit("POST /api/v2/search");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "search v2 unavailable"})),
    )
        .into_response()
}

async fn fake_legacy_search(
    State(s): State<FakeService>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    s.hit(format!(
        "GET /api/search q={}",
        q.get("q").cloned().unwrap_or_default()
    ));
    if s.search_empty {
        return Json(json!({"results": []}));
    }
    // snake_case, flat, legacy-style record
    Json(json!({
        "results": [{
            "_id": "c1",
            "title": "Deep Work",
            "content_type": "article",
            "source_url": "https://example.com/deep-work",
            "ai_summary": "Focus without distraction is a skill.",
            "tags": ["productivity"],
            "score": 0.82,
            "created_at": "2024-03-01T10:00:00Z"
        }],
        "total": 1
    }))
}

async fn fake_recent(
    State(s): State<FakeService>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    s.hit(format!("GET /api/content limit={}", limit));
    let items: Vec<Value> = (0..limit.min(8))
        .map(|i| {
            json!({
                "id": format!("r{}", i),
                "title": format!("Recent {}", i),
                "contentType": "article",
                "url": format!("https://example.com/r{}", i)
            })
        })
        .collect();
    Json(json!({"items": items}))
}

async fn fake_get_content(State(s): State<FakeService>, Path(id): Path<String>) -> Response {
    s.hit(format!("GET /api/content/{}", id));
    match id.as_str() {
        "big" => Json(json!({
            "data": {
                "id": "big",
                "title": "A Very Long Read",
                "contentType": "article",
                "url": "https://example.com/big",
                "tokenCount": 120000,
                "fullText": "word ".repeat(2000)
            }
        }))
        .into_response(),
        "c1" => Json(json!({
            "id": "c1",
            "title": "Deep Work",
            "contentType": "article",
            "url": "https://example.com/deep-work",
            "fullText": "Short body."
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "content not found"})),
        )
            .into_response(),
    }
}

async fn fake_modern_synthesis(State(s): State<FakeService>) -> Response {
    s.hit("POST /api/v2/synthesis");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"message": "synthesis worker crashed"})),
    )
        .into_response()
}

async fn fake_legacy_synthesis(
    State(s): State<FakeService>,
    Json(_body): Json<Value>,
) -> Json<Value> {
    s.hit("POST /api/synthesize");
    Json(json!({"summary": "Habits compound when the cue is obvious."}))
}

async fn fake_update_tags(State(s): State<FakeService>, Path(id): Path<String>) -> Json<Value> {
    s.hit(format!("PUT /api/content/{}/tags", id));
    Json(json!({"id": id}))
}

async fn start_fake_service(service: FakeService) -> String {
    let app = Router::new()
        .route("/api/auth/verify", get(fake_verify))
        .route("/api/v2/search", post(fake_modern_search))
        .route("/api/search", get(fake_legacy_search))
        .route("/api/content", get(fake_recent))
        .route("/api/content/{id}", get(fake_get_content))
        .route("/api/content/{id}/tags", put(fake_update_tags))
        .route("/api/v2/synthesis", post(fake_modern_synthesis))
        .route("/api/synthesize", post(fake_legacy_synthesis))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    base
}

// ─── Relay under test ───────────────────────────────────────────────

/// Config written to disk and loaded the way `relay` loads it. The key
/// variable is one nobody sets, so the inline key is used.
fn test_config(tmp: &TempDir, backend_url: &str, api_key: &str, read_only: bool) -> Config {
    let body = format!(
        r#"
[backend]
base_url = "{}"
api_key_env = "RELAY_INTEGRATION_KEY_NEVER_SET"
api_key = "{}"
timeout_secs = 5

[server]
read_only = {}
"#,
        backend_url, api_key, read_only
    );
    let path = tmp.path().join("relay.toml");
    std::fs::write(&path, body).unwrap();
    load_config(&path).unwrap()
}

async fn wait_for_server(base: &str) {
    let client = reqwest::Client::new();
    let url = format!("{}/health", base);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_relay(cfg: Config) -> String {
    let ctx = ToolContext::from_config(Arc::new(cfg));
    let app = build_router(ctx, Arc::new(ToolRegistry::with_builtins()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        serve(listener, app).await.ok();
    });
    wait_for_server(&base).await;
    base
}

async fn call_tool(base: &str, tool: &str, params: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/tools/{}", base, tool))
        .json(&params)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ─── Tests ──────────────────────────────────────────────────────────

/// The modern endpoint answers 503; the relay must degrade to the legacy
/// endpoint and still return canonical camelCase records.
#[tokio::test]
async fn test_search_degrades_to_legacy_surface() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService::default();
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(
        &relay,
        "search_content",
        json!({"query": "productivity", "mode": "any"}),
    )
    .await;
    assert_eq!(status, 200, "unexpected body: {}", body);

    let result = &body["result"];
    assert_eq!(result["surface"], "legacy");
    assert_eq!(result["mode"], "hybrid");
    assert_eq!(result["total"], 1);

    let first = &result["results"][0];
    assert_eq!(first["id"], "c1");
    assert_eq!(first["contentType"], "article");
    assert_eq!(first["url"], "https://example.com/deep-work");
    assert_eq!(first["relevanceScore"], 0.82);
    assert_eq!(first["tags"], json!(["productivity"]));
    assert!(first.get("content_type").is_none());
    assert!(first["fullText"].is_null());

    let hits = service.hits();
    let modern = hits.iter().position(|h| h == "POST /api/v2/search");
    let legacy = hits
        .iter()
        .position(|h| h == "GET /api/search q=productivity");
    assert!(
        modern.is_some() && legacy.is_some() && modern < legacy,
        "expected modern then legacy search, got {:?}",
        hits
    );
}

#[tokio::test]
async fn test_rejected_credential_is_unauthorized() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService::default();
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, "wrong-key", false)).await;

    let (status, body) = call_tool(&relay, "search_content", json!({"query": "anything"})).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "unauthorized");

    // Nothing past the auth check was attempted.
    assert_eq!(service.hits(), vec!["GET /api/auth/verify".to_string()]);
}

#[tokio::test]
async fn test_large_item_requires_confirmation() {
    let tmp = TempDir::new().unwrap();
    let backend = start_fake_service(FakeService::default()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(&relay, "get_content_details", json!({"id": "big"})).await;
    assert_eq!(status, 200);
    let result = &body["result"];
    assert_eq!(result["status"], "requires_confirmation");
    assert_eq!(result["tokenEstimate"], 120000);
    assert_eq!(result["overrideParam"], "allow_large_content");
    assert_eq!(result["preview"]["id"], "big");
    assert_eq!(result["preview"]["truncated"], true);
    assert!(result.get("content").is_none());

    let (status, body) = call_tool(
        &relay,
        "get_content_details",
        json!({"id": "big", "allow_large_content": true}),
    )
    .await;
    assert_eq!(status, 200);
    let result = &body["result"];
    assert_eq!(result["status"], "full");
    assert_eq!(result["content"]["id"], "big");
    assert_eq!(
        result["content"]["fullText"].as_str().unwrap().len(),
        "word ".len() * 2000
    );
}

#[tokio::test]
async fn test_small_item_is_returned_in_full() {
    let tmp = TempDir::new().unwrap();
    let backend = start_fake_service(FakeService::default()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(&relay, "get_content_details", json!({"id": "c1"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["status"], "full");
    assert_eq!(body["result"]["content"]["fullText"], "Short body.");
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let backend = start_fake_service(FakeService::default()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(&relay, "get_content_details", json!({"id": "nope"})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_read_only_rejects_writes_before_any_backend_call() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService::default();
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, true)).await;

    let (status, body) = call_tool(
        &relay,
        "tag_content",
        json!({"id": "c1", "tags": ["focus"]}),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "read_only");
    assert!(service.hits().is_empty(), "got {:?}", service.hits());

    // Reads still work on a read-only server.
    let (status, _) = call_tool(&relay, "get_content_details", json!({"id": "c1"})).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_write_reaches_backend_when_allowed() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService::default();
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(
        &relay,
        "tag_content",
        json!({"id": "c1", "tags": ["focus", "Focus", " deep "]}),
    )
    .await;
    assert_eq!(status, 200, "unexpected body: {}", body);
    assert_eq!(body["result"]["success"], true);
    assert!(service
        .hits()
        .contains(&"PUT /api/content/c1/tags".to_string()));
}

#[tokio::test]
async fn test_synthesis_falls_back_to_recent_items() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService {
        search_empty: true,
        ..Default::default()
    };
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;

    let (status, body) = call_tool(
        &relay,
        "synthesize_content",
        json!({"query": "habit formation", "max_sources": 5}),
    )
    .await;
    assert_eq!(status, 200, "unexpected body: {}", body);

    let result = &body["result"];
    assert_eq!(result["status"], "completed");
    assert_eq!(result["surface"], "legacy");
    assert_eq!(result["sources"]["tier"], "recent");
    assert_eq!(
        result["sources"]["ids"],
        json!(["r0", "r1", "r2", "r3", "r4"])
    );

    let hits = service.hits();
    assert!(hits.contains(&"GET /api/content limit=5".to_string()));
    assert!(hits.contains(&"POST /api/v2/synthesis".to_string()));
    assert!(hits.contains(&"POST /api/synthesize".to_string()));
}

#[tokio::test]
async fn test_tool_list_health_and_dispatch_errors() {
    let tmp = TempDir::new().unwrap();
    let service = FakeService::default();
    let backend = start_fake_service(service.clone()).await;
    let relay = start_relay(test_config(&tmp, &backend, TEST_KEY, false)).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", relay))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let list: Value = client
        .get(format!("{}/tools/list", relay))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tools = list["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 9);
    let mutating: Vec<&str> = tools
        .iter()
        .filter(|t| t["mutates"] == true)
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(mutating, vec!["tag_content", "set_content_flag", "save_content"]);
    assert!(tools
        .iter()
        .all(|t| t["parameters"]["type"] == "object"));

    let (status, body) = call_tool(&relay, "nonexistent", json!({})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = call_tool(&relay, "search_content", json!({"limit": 3})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    // Neither listing nor rejected calls touched the backend.
    assert!(service.hits().is_empty(), "got {:?}", service.hits());
}

/// Ids are caller input. Whatever they contain, the request must land on
/// `/api/content/<id>` with no query string.
#[tokio::test]
async fn test_content_ids_cannot_escape_their_path_segment() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let app = Router::new().fallback(move |uri: Uri| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().unwrap().push(uri.to_string());
            Json(json!({"id": "x", "url": "https://example.com/x"}))
        }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let backend = HttpBackend::new(&base, TEST_KEY, std::time::Duration::from_secs(5)).unwrap();
    backend.get_content("../auth/verify").await.unwrap();
    backend.get_content("abc?sort=recent&limit=999").await.unwrap();
    backend
        .update_tags("../../admin/x", &["t".to_string()])
        .await
        .unwrap();
    backend
        .set_flag("a#frag", ContentFlag::Favorite, true)
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "/api/content/..%2Fauth%2Fverify".to_string(),
            "/api/content/abc%3Fsort=recent&limit=999".to_string(),
            "/api/content/..%2F..%2Fadmin%2Fx/tags".to_string(),
            "/api/content/a%23frag".to_string(),
        ]
    );

    // Dot segments are refused outright instead of being resolved.
    let err = backend.get_content("..").await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidRequest(_)));
    assert_eq!(seen.lock().unwrap().len(), 4);
}
