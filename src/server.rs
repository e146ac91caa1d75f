//! HTTP tool server.
//!
//! Serves the [`ToolRegistry`] two ways: a plain JSON API and the MCP
//! Streamable HTTP transport. Both dispatch through
//! [`crate::traits::dispatch`] and share one lazily-initialized backend
//! handle.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool; the body is its parameter object |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `*`    | `/mcp` | MCP JSON-RPC over Streamable HTTP |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! | Status | Code | Cause |
//! |--------|------|-------|
//! | 400 | `bad_request` | parameter validation, invalid request |
//! | 401 | `unauthorized` | backend rejected the credential |
//! | 403 | `read_only` | mutating tool on a read-only server |
//! | 404 | `not_found` | unknown tool, or the backend answered 404 |
//! | 502 | `backend_error` | backend unavailable or transport failure |
//! | 502 | `schema_violation` | backend payload could not be normalized |
//! | 500 | `internal` | anything else |
//!
//! # MCP client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "content-relay": { "url": "http://127.0.0.1:7341/mcp" }
//!   }
//! }
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use content_relay_core::RelayError;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::mcp::McpBridge;
use crate::traits::{dispatch, DispatchError, ToolContext, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    tools: Arc<ToolRegistry>,
    ctx: ToolContext,
}

/// Starts the server with the built-in tools on `[server].bind`.
///
/// This is the entry point used by `relay serve mcp`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_extensions(config, ToolRegistry::with_builtins()).await
}

/// Starts the server with a caller-assembled registry (built-ins plus any
/// custom [`crate::traits::Tool`] implementations).
pub async fn run_server_with_extensions(
    config: &Config,
    tools: ToolRegistry,
) -> anyhow::Result<()> {
    let config = Arc::new(config.clone());
    let ctx = ToolContext::from_config(config.clone());

    for t in tools.tools() {
        let tag = if t.mutates() { "write" } else { "read" };
        info!(tool = t.name(), access = tag, "registered tool");
    }
    if config.server.read_only {
        info!("read-only mode: mutating tools are disabled");
    }

    let app = build_router(ctx, Arc::new(tools));
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "tool server listening");
    serve(listener, app).await
}

/// Router with every endpoint mounted. Exposed for embedding and tests.
pub fn build_router(ctx: ToolContext, tools: Arc<ToolRegistry>) -> Router {
    let bridge = McpBridge::new(ctx.clone(), tools.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(AppState { tools, ctx })
}

/// Serve `app` on an already-bound listener until the process ends.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
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

/// Map a dispatch failure onto a status code by its typed cause.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let (status, code) = if let Some(d) = err.downcast_ref::<DispatchError>() {
        match d {
            DispatchError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DispatchError::ReadOnly(_) => (StatusCode::FORBIDDEN, "read_only"),
            DispatchError::InvalidParams(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    } else if let Some(r) = err.downcast_ref::<RelayError>() {
        match r {
            RelayError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            RelayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RelayError::Backend { status: 404, .. } => (StatusCode::NOT_FOUND, "not_found"),
            RelayError::Backend { .. } | RelayError::Transport(_) => {
                (StatusCode::BAD_GATEWAY, "backend_error")
            }
            RelayError::SchemaViolation { .. } => (StatusCode::BAD_GATEWAY, "schema_violation"),
        }
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
    };

    if status.is_server_error() {
        warn!(tool = tool_name, error = %err, "tool call failed");
    }

    AppError {
        status,
        code,
        message: format!("{}: {}", tool_name, err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
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

/// Unified tool dispatch: 404 for unknown tools, 403 for writes on a
/// read-only server, 400 for parameter errors, then the tool's own result.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = dispatch(&state.tools, &state.ctx, &name, params)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
