//! MCP server implementation
//!
//! [`McpServer`] adapts the transport-agnostic [`Dispatcher`] to rmcp's
//! `ServerHandler`: `tools/list` is served from the registry and `tools/call`
//! is routed through the dispatcher, with dispatch failures mapped onto
//! JSON-RPC error codes.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ErrorCode, JsonObject, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::Value;
use tracing::info;

use crate::dispatch::{DispatchError, Dispatcher, ErrorKind, ToolCallRequest};
use crate::tool::{ToolCallResult, ToolDescriptor};

pub const SERVER_NAME: &str = "spellbook-mcp";

/// Main MCP server coordinator
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The registry as rmcp tool descriptors, in registry order.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.list().iter().map(to_tool).collect()
    }

    /// Run one tool call and convert the outcome for the wire.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let request = ToolCallRequest::new(name, arguments.unwrap_or_default());
        self.dispatcher
            .handle(request)
            .await
            .map(to_call_result)
            .map_err(to_mcp_error)
    }
}

fn to_tool(descriptor: &ToolDescriptor) -> Tool {
    let schema = match descriptor.input.to_json() {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    Tool::new(
        descriptor.name.clone(),
        descriptor.description.clone(),
        Arc::new(schema),
    )
}

fn to_call_result(result: ToolCallResult) -> CallToolResult {
    CallToolResult::success(
        result
            .content
            .into_iter()
            .map(|block| Content::text(block.text))
            .collect(),
    )
}

/// Map a dispatch failure onto its JSON-RPC error.
pub fn to_mcp_error(err: DispatchError) -> McpError {
    let code = match err.kind() {
        ErrorKind::MethodNotFound => ErrorCode::METHOD_NOT_FOUND,
        ErrorKind::InvalidParams => ErrorCode::INVALID_PARAMS,
        ErrorKind::Internal => ErrorCode::INTERNAL_ERROR,
    };
    McpError::new(code, err.to_string(), Some(err.data()))
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            format!(
                "{SERVER_NAME} v{} - prompt library, SDLC template generators and an SDLC orchestrator",
                env!("CARGO_PKG_VERSION")
            ),
        )
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = %request.name, "tools/call");
        self.dispatch(&request.name, request.arguments).await
    }
}
