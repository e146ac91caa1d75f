//! MCP JSON-RPC protocol bridge.
//!
//! Exposes the [`ToolRegistry`] as MCP tools over the Streamable HTTP
//! transport mounted at `/mcp`. Calls go through the same [`dispatch`] as
//! `POST /tools/{name}`, so read-only mode and parameter validation apply
//! identically. Tool failures are reported as MCP tool errors
//! (`isError: true`) rather than protocol errors, except for unknown tools.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::traits::{dispatch, DispatchError, ToolContext, ToolRegistry};

/// Each MCP session receives a clone; everything is behind `Arc`, so all
/// sessions share one tool set and one backend handle.
#[derive(Clone)]
pub struct McpBridge {
    ctx: ToolContext,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(ctx: ToolContext, tools: Arc<ToolRegistry>) -> Self {
        Self { ctx, tools }
    }

    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        let annotations = ToolAnnotations::new().read_only(!tool.mutates());

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(annotations),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "content-relay".to_string(),
                title: Some("Content Relay".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Content Relay searches, retrieves, and synthesizes the user's saved content. \
                 Start with search_content, fetch items with get_content_details or \
                 batch_get_content, and use synthesize_content or extract_frameworks for \
                 cross-source analysis. Large texts come back as previews; repeat the call \
                 with allow_large_content=true to receive them in full."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match dispatch(&self.tools, &self.ctx, &request.name, params).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => match e.downcast_ref::<DispatchError>() {
                Some(DispatchError::NotFound(_)) => Err(McpError::new(
                    ErrorCode::METHOD_NOT_FOUND,
                    e.to_string(),
                    None,
                )),
                _ => Ok(CallToolResult::error(vec![Content::text(format!(
                    "{}: {}",
                    request.name, e
                ))])),
            },
        }
    }
}
