//! Tool trait, built-in tools, and the registry they are served from.
//!
//! Every downstream operation is a [`Tool`]: a name, a description, a JSON
//! parameter schema, a flag saying whether it mutates remote state, and an
//! async `execute`. The HTTP server, the MCP bridge, and `relay tool call`
//! all go through [`dispatch`], which enforces read-only mode and validates
//! parameters before a tool runs.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ToolRegistry                  │
//! │  search_content   get_content_details  ...   │
//! │  tag_content*     set_content_flag*    ...   │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!     dispatch(): read-only check → validate → execute
//! ```
//!
//! Tools marked `*` mutate remote state.
//!
//! # Custom tools
//!
//! ```rust
//! use async_trait::async_trait;
//! use anyhow::Result;
//! use serde_json::{json, Value};
//! use content_relay::traits::{Tool, ToolContext, ToolRegistry};
//!
//! pub struct PingTool;
//!
//! #[async_trait]
//! impl Tool for PingTool {
//!     fn name(&self) -> &str { "ping" }
//!     fn description(&self) -> &str { "Check the backend credential" }
//!     fn parameters_schema(&self) -> Value {
//!         json!({ "type": "object", "properties": {} })
//!     }
//!     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
//!         ctx.backend().await?;
//!         Ok(json!({ "ok": true }))
//!     }
//! }
//!
//! let mut tools = ToolRegistry::with_builtins();
//! tools.register(Box::new(PingTool));
//! ```

use anyhow::Result;
use async_trait::async_trait;
use content_relay_core::backend::Backend;
use content_relay_core::budget::OVERRIDE_PARAM;
use content_relay_core::models::{ContentFlag, ContentType, SynthesisMode, SynthesisRequest};
use content_relay_core::planner::CallerMode;
use content_relay_core::retrieval::SearchOptions;
use content_relay_core::RelayError;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::frameworks::{extraction_options, find_frameworks};
use crate::get::{batch_get_content, get_content_details, MAX_BATCH_IDS};
use crate::mutate::{save_content, set_content_flag, tag_content};
use crate::params::{
    bool_or, opt_bool, opt_f64, opt_str, opt_u64, required_str, string_list, validate_params,
};
use crate::recent::list_recent_content;
use crate::search::search_content;
use crate::session::ClientHandle;
use crate::synthesize::{clamp_sources, synthesize_content};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait Tool: Send + Sync {
    /// Route segment (`POST /tools/{name}`) and MCP tool name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Built-in tools are marked `"builtin": true` in `GET /tools/list`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Whether calling this tool changes remote state. Read-only
    /// deployments refuse these before any network call.
    fn mutates(&self) -> bool {
        false
    }

    /// JSON Schema for the parameters: `type: "object"`, `properties`,
    /// and optionally `required`.
    fn parameters_schema(&self) -> Value;

    /// Execute with validated parameters (defaults already injected).
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool descriptor for `GET /tools/list` and `relay tool list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub mutates: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            mutates: tool.mutates(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// What a tool can reach while it runs: the config and the shared,
/// lazily-initialized backend handle.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    client: Arc<ClientHandle>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, client: Arc<ClientHandle>) -> Self {
        Self { config, client }
    }

    /// Context whose backend is built from `[backend]` on first use.
    pub fn from_config(config: Arc<Config>) -> Self {
        let client = Arc::new(ClientHandle::from_config(&config.backend));
        Self::new(config, client)
    }

    /// The shared backend. The first call verifies the credential.
    pub async fn backend(&self) -> Result<Arc<dyn Backend>> {
        Ok(self.client.get().await?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no tool registered with name: {0}")]
    NotFound(String),
    #[error("tool '{0}' modifies content and the server is read-only")]
    ReadOnly(String),
    #[error("{0}")]
    InvalidParams(String),
}

/// Look up, gate, validate, and execute a tool.
pub async fn dispatch(
    tools: &ToolRegistry,
    ctx: &ToolContext,
    name: &str,
    params: Value,
) -> Result<Value> {
    let tool = tools
        .find(name)
        .ok_or_else(|| DispatchError::NotFound(name.to_string()))?;

    if tool.mutates() && ctx.config.server.read_only {
        return Err(DispatchError::ReadOnly(name.to_string()).into());
    }

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| DispatchError::InvalidParams(e.to_string()))?;

    tool.execute(params, ctx).await
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

fn caller_modes() -> Vec<String> {
    CallerMode::ALL
        .iter()
        .map(|m| {
            serde_json::to_value(m)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        })
        .collect()
}

fn content_type_names() -> Vec<&'static str> {
    ContentType::ALL.iter().map(|t| t.as_str()).collect()
}

fn parse_content_types(values: &[String]) -> Result<Vec<ContentType>> {
    values
        .iter()
        .map(|v| {
            v.parse::<ContentType>()
                .map_err(|e| anyhow::Error::from(RelayError::InvalidRequest(e)))
        })
        .collect()
}

pub struct SearchContentTool;

#[async_trait]
impl Tool for SearchContentTool {
    fn name(&self) -> &str {
        "search_content"
    }

    fn description(&self) -> &str {
        "Search saved content, falling back to the legacy search when the primary search fails or finds nothing"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" },
                "mode": { "type": "string", "enum": caller_modes(), "default": "smart" },
                "expand_concepts": { "type": "boolean", "description": "Broaden with related concepts (default: on)" },
                "limit": { "type": "integer", "minimum": 1, "description": "Max results" },
                "offset": { "type": "integer", "minimum": 0, "default": 0 },
                "content_types": { "type": "array", "items": { "type": "string" }, "description": format!("Any of: {}", content_type_names().join(", ")) },
                "tags": { "type": "array", "items": { "type": "string" } },
                "date_from": { "type": "string", "description": "ISO 8601 date" },
                "date_to": { "type": "string", "description": "ISO 8601 date" },
                "include_full_content": { "type": "boolean", "default": false },
                "explain_matches": { "type": "boolean", "default": false },
                OVERRIDE_PARAM: { "type": "boolean", "default": false, "description": "Release full text above the batch budget" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = required_str(&params, "query")?;
        let opts = SearchOptions {
            mode: CallerMode::parse_lenient(opt_str(&params, "mode").unwrap_or("smart")),
            expand_concepts: opt_bool(&params, "expand_concepts"),
            limit: ctx.config.retrieval.clamp_limit(opt_u64(&params, "limit")),
            offset: opt_u64(&params, "offset").unwrap_or(0) as usize,
            content_types: parse_content_types(&string_list(&params, "content_types"))?,
            tags: string_list(&params, "tags"),
            date_from: opt_str(&params, "date_from").map(str::to_string),
            date_to: opt_str(&params, "date_to").map(str::to_string),
            include_full_content: bool_or(&params, "include_full_content", false),
            explain_matches: bool_or(&params, "explain_matches", false),
        };

        let backend = ctx.backend().await?;
        let response = search_content(
            &ctx.config,
            backend.as_ref(),
            query,
            opts,
            bool_or(&params, OVERRIDE_PARAM, false),
        )
        .await?;
        Ok(serde_json::to_value(&response)?)
    }
}

pub struct GetContentDetailsTool;

#[async_trait]
impl Tool for GetContentDetailsTool {
    fn name(&self) -> &str {
        "get_content_details"
    }

    fn description(&self) -> &str {
        "Retrieve one saved item by id; large full text is replaced by a preview unless allow_large_content is set"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Content id" },
                "include_full_text": { "type": "boolean", "default": true },
                OVERRIDE_PARAM: { "type": "boolean", "default": false }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = required_str(&params, "id")?;
        let backend = ctx.backend().await?;
        let release = get_content_details(
            &ctx.config,
            backend.as_ref(),
            id,
            bool_or(&params, "include_full_text", true),
            bool_or(&params, OVERRIDE_PARAM, false),
        )
        .await?;
        Ok(serde_json::to_value(&release)?)
    }
}

pub struct BatchGetContentTool;

#[async_trait]
impl Tool for BatchGetContentTool {
    fn name(&self) -> &str {
        "batch_get_content"
    }

    fn description(&self) -> &str {
        "Retrieve several saved items by id; the combined full text is budget-gated"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": MAX_BATCH_IDS
                },
                "include_full_text": { "type": "boolean", "default": true },
                OVERRIDE_PARAM: { "type": "boolean", "default": false }
            },
            "required": ["ids"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let ids = string_list(&params, "ids");
        let backend = ctx.backend().await?;
        let response = batch_get_content(
            &ctx.config,
            backend.as_ref(),
            &ids,
            bool_or(&params, "include_full_text", true),
            bool_or(&params, OVERRIDE_PARAM, false),
        )
        .await?;
        Ok(serde_json::to_value(&response)?)
    }
}

pub struct ListRecentContentTool;

#[async_trait]
impl Tool for ListRecentContentTool {
    fn name(&self) -> &str {
        "list_recent_content"
    }

    fn description(&self) -> &str {
        "List the most recently saved items"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let backend = ctx.backend().await?;
        let response =
            list_recent_content(&ctx.config, backend.as_ref(), opt_u64(&params, "limit")).await?;
        Ok(serde_json::to_value(&response)?)
    }
}

fn synthesis_request(params: &Value, config: &Config) -> Result<SynthesisRequest> {
    let query = required_str(params, "query")?;
    let mode = match opt_str(params, "mode") {
        Some(m) => m
            .parse::<SynthesisMode>()
            .map_err(RelayError::InvalidRequest)?,
        None => SynthesisMode::Overview,
    };
    Ok(SynthesisRequest {
        query: query.to_string(),
        content_ids: string_list(params, "content_ids"),
        mode,
        find_contradictions: bool_or(params, "find_contradictions", false),
        find_connections: bool_or(params, "find_connections", true),
        max_sources: clamp_sources(config, opt_u64(params, "max_sources")),
    })
}

pub struct SynthesizeContentTool;

#[async_trait]
impl Tool for SynthesizeContentTool {
    fn name(&self) -> &str {
        "synthesize_content"
    }

    fn description(&self) -> &str {
        "Synthesize insights, themes, and connections across saved content"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Topic to synthesize" },
                "content_ids": { "type": "array", "items": { "type": "string" }, "description": "Explicit sources; found by search when omitted" },
                "mode": { "type": "string", "enum": ["overview", "deep", "actionable", "comparison"], "default": "overview" },
                "find_contradictions": { "type": "boolean", "default": false },
                "find_connections": { "type": "boolean", "default": true },
                "max_sources": { "type": "integer", "minimum": 1 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let request = synthesis_request(&params, &ctx.config)?;
        let backend = ctx.backend().await?;
        let outcome = synthesize_content(backend.as_ref(), &request).await?;
        Ok(serde_json::to_value(&outcome)?)
    }
}

pub struct ExtractFrameworksTool;

#[async_trait]
impl Tool for ExtractFrameworksTool {
    fn name(&self) -> &str {
        "extract_frameworks"
    }

    fn description(&self) -> &str {
        "Find named methodologies with ordered steps in saved content"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "content_ids": { "type": "array", "items": { "type": "string" } },
                "min_confidence": { "type": "number", "minimum": 0.0, "maximum": 0.95 },
                "limit": { "type": "integer", "minimum": 1 },
                "max_sources": { "type": "integer", "minimum": 1 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let request = synthesis_request(&params, &ctx.config)?;
        let opts = extraction_options(
            &ctx.config,
            opt_f64(&params, "min_confidence"),
            opt_u64(&params, "limit"),
        );
        let backend = ctx.backend().await?;
        let outcome = find_frameworks(backend.as_ref(), &request, &opts).await?;
        Ok(serde_json::to_value(&outcome)?)
    }
}

pub struct TagContentTool;

#[async_trait]
impl Tool for TagContentTool {
    fn name(&self) -> &str {
        "tag_content"
    }

    fn description(&self) -> &str {
        "Replace the tags on a saved item"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn mutates(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" }, "minItems": 1 }
            },
            "required": ["id", "tags"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = required_str(&params, "id")?;
        let backend = ctx.backend().await?;
        let ack = tag_content(backend.as_ref(), id, &string_list(&params, "tags")).await?;
        Ok(serde_json::to_value(&ack)?)
    }
}

pub struct SetContentFlagTool;

#[async_trait]
impl Tool for SetContentFlagTool {
    fn name(&self) -> &str {
        "set_content_flag"
    }

    fn description(&self) -> &str {
        "Mark a saved item as favorite or archived (or clear the flag)"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn mutates(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "flag": { "type": "string", "enum": ["favorite", "archived"] },
                "value": { "type": "boolean", "default": true }
            },
            "required": ["id", "flag"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = required_str(&params, "id")?;
        let flag: ContentFlag = required_str(&params, "flag")?
            .parse()
            .map_err(RelayError::InvalidRequest)?;
        let backend = ctx.backend().await?;
        let ack =
            set_content_flag(backend.as_ref(), id, flag, bool_or(&params, "value", true)).await?;
        Ok(serde_json::to_value(&ack)?)
    }
}

pub struct SaveContentTool;

#[async_trait]
impl Tool for SaveContentTool {
    fn name(&self) -> &str {
        "save_content"
    }

    fn description(&self) -> &str {
        "Save a URL for the content service to ingest"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn mutates(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "http(s) URL" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let url = required_str(&params, "url")?;
        let backend = ctx.backend().await?;
        let ack = save_content(backend.as_ref(), url, &string_list(&params, "tags")).await?;
        Ok(serde_json::to_value(&ack)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for built-in and custom tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the nine built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchContentTool));
        registry.register(Box::new(GetContentDetailsTool));
        registry.register(Box::new(BatchGetContentTool));
        registry.register(Box::new(ListRecentContentTool));
        registry.register(Box::new(SynthesizeContentTool));
        registry.register(Box::new(ExtractFrameworksTool));
        registry.register(Box::new(TagContentTool));
        registry.register(Box::new(SetContentFlagTool));
        registry.register(Box::new(SaveContentTool));
        registry
    }

    /// Register a tool. Lookups return the first tool registered under a name.
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
        self.tools.iter().map(|t| ToolInfo::from_tool(t.as_ref())).collect()
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
    use content_relay_core::backend::scripted::{Op, ScriptedBackend};

    fn ctx_with(backend: Arc<ScriptedBackend>, read_only: bool) -> ToolContext {
        let mut config = Config::for_base_url("http://backend.test");
        config.server.read_only = read_only;
        ToolContext::new(Arc::new(config), Arc::new(ClientHandle::from_backend(backend)))
    }

    #[test]
    fn test_builtin_catalog() {
        let tools = ToolRegistry::with_builtins();
        assert_eq!(tools.len(), 9);
        let mutating: Vec<&str> = tools
            .tools()
            .iter()
            .filter(|t| t.mutates())
            .map(|t| t.name())
            .collect();
        assert_eq!(mutating, vec!["tag_content", "set_content_flag", "save_content"]);
        for t in tools.tools() {
            assert_eq!(t.parameters_schema()["type"], "object", "{}", t.name());
        }
    }

    #[test]
    fn test_search_schema_lists_every_mode() {
        let schema = SearchContentTool.parameters_schema();
        let modes = schema["properties"]["mode"]["enum"].as_array().unwrap();
        assert_eq!(modes.len(), 7);
        assert!(modes.contains(&json!("phrase")));
    }

    #[tokio::test]
    async fn test_read_only_rejects_before_network() {
        let backend = Arc::new(ScriptedBackend::new());
        let ctx = ctx_with(backend.clone(), true);
        let tools = ToolRegistry::with_builtins();

        let err = dispatch(&tools, &ctx, "tag_content", json!({"id": "a", "tags": ["x"]}))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::ReadOnly(_))
        ));
        assert!(backend.sequence().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_still_allows_reads() {
        let backend = Arc::new(
            ScriptedBackend::new().respond(Op::ListRecent, Ok(json!([{"id": "1", "url": "u"}]))),
        );
        let ctx = ctx_with(backend, true);
        let tools = ToolRegistry::with_builtins();
        let out = dispatch(&tools, &ctx, "list_recent_content", json!({}))
            .await
            .unwrap();
        assert_eq!(out["count"], 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_params() {
        let backend = Arc::new(ScriptedBackend::new());
        let ctx = ctx_with(backend.clone(), false);
        let tools = ToolRegistry::with_builtins();

        let err = dispatch(&tools, &ctx, "nope", json!({})).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::NotFound(_))
        ));

        let err = dispatch(&tools, &ctx, "search_content", json!({"query": "x", "mode": "loud"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::InvalidParams(_))
        ));
        assert!(backend.sequence().is_empty());
    }

    #[tokio::test]
    async fn test_search_tool_end_to_end() {
        let backend = Arc::new(ScriptedBackend::new().respond(
            Op::Search,
            Ok(json!({"results": [{"content": {"id": "a", "url": "u", "content_type": "youtube"}, "score": 0.7}]})),
        ));
        let ctx = ctx_with(backend.clone(), false);
        let tools = ToolRegistry::with_builtins();

        let out = dispatch(
            &tools,
            &ctx,
            "search_content",
            json!({"query": "focus", "mode": "any", "expand_concepts": false, "content_types": ["video"]}),
        )
        .await
        .unwrap();
        assert_eq!(out["mode"], "hybrid");
        assert_eq!(out["results"][0]["contentType"], "video");
        assert_eq!(out["results"][0]["relevanceScore"], 0.7);

        let sent = &backend.requests(Op::Search)[0];
        assert_eq!(sent["mode"], "hybrid");
        assert_eq!(sent["filters"]["contentTypes"], json!(["video"]));
    }

    #[tokio::test]
    async fn test_invalid_content_type_is_invalid_request() {
        let backend = Arc::new(ScriptedBackend::new());
        let ctx = ctx_with(backend, false);
        let err = dispatch(
            &ToolRegistry::with_builtins(),
            &ctx,
            "search_content",
            json!({"query": "x", "content_types": ["hologram"]}),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelayError>(),
            Some(RelayError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_set_flag_tool() {
        let backend = Arc::new(ScriptedBackend::new().respond(Op::SetFlag, Ok(json!({}))));
        let ctx = ctx_with(backend.clone(), false);
        let out = dispatch(
            &ToolRegistry::with_builtins(),
            &ctx,
            "set_content_flag",
            json!({"id": "a", "flag": "favorite"}),
        )
        .await
        .unwrap();
        assert_eq!(out["operation"], "flag");
        assert_eq!(backend.requests(Op::SetFlag)[0]["isFavorite"], true);
    }
}
