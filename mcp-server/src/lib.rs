//! MCP (JSON-RPC over stdio) front end for the pkgwatch tool dispatcher.
//!
//! stdout carries protocol frames only; all logging goes to stderr.

use std::sync::Arc;

use anyhow::Context;
use rmcp::model::{
  CallToolRequestParams, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
  ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use tracing::info;

use pkgwatch_core::ToolDispatcher;
use pkgwatch_core::tools::spec::ToolSpec;
use pkgwatch_protocol::{ProtocolError, ResponseEnvelope};

const INSTRUCTIONS: &str = "Look up npm packages (search, versions, details, package page text) \
  and check or apply dependency updates to a package.json. Registry calls are rate limited and \
  every tool call has a deadline.";

#[derive(Clone)]
pub struct PkgwatchServer {
  dispatcher: Arc<ToolDispatcher>,
  tools: Arc<Vec<Tool>>,
}

impl PkgwatchServer {
  pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
    let tools = dispatcher.specs().map(to_mcp_tool).collect();
    Self {
      dispatcher,
      tools: Arc::new(tools),
    }
  }

  pub fn tools(&self) -> &[Tool] {
    &self.tools
  }
}

impl ServerHandler for PkgwatchServer {
  fn get_info(&self) -> ServerInfo {
    ServerInfo {
      capabilities: ServerCapabilities::builder().enable_tools().build(),
      server_info: Implementation {
        name: "pkgwatch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..Implementation::default()
      },
      instructions: Some(INSTRUCTIONS.to_string()),
      ..ServerInfo::default()
    }
  }

  async fn list_tools(
    &self,
    _request: Option<PaginatedRequestParams>,
    _context: RequestContext<RoleServer>,
  ) -> Result<ListToolsResult, McpError> {
    Ok(ListToolsResult::with_all_items(self.tools.as_ref().clone()))
  }

  async fn call_tool(
    &self,
    request: CallToolRequestParams,
    _context: RequestContext<RoleServer>,
  ) -> Result<CallToolResult, McpError> {
    let arguments = request.arguments.map(Value::Object);
    match self.dispatcher.dispatch(&request.name, arguments).await {
      Ok(envelope) => Ok(envelope_to_result(envelope)),
      Err(err) => Err(protocol_error_to_mcp(&err)),
    }
  }
}

/// Advertised form of a tool spec.
pub fn to_mcp_tool(spec: &ToolSpec) -> Tool {
  let schema: JsonObject = match spec.input_schema.to_value() {
    Value::Object(schema) => schema,
    _ => JsonObject::new(),
  };
  Tool::new(spec.name.clone(), spec.description.clone(), Arc::new(schema))
}

pub fn envelope_to_result(envelope: ResponseEnvelope) -> CallToolResult {
  let content: Vec<Content> = envelope
    .content
    .into_iter()
    .map(|segment| Content::text(segment.text))
    .collect();
  if envelope.is_error {
    CallToolResult::error(content)
  } else {
    CallToolResult::success(content)
  }
}

pub fn protocol_error_to_mcp(err: &ProtocolError) -> McpError {
  match err {
    ProtocolError::UnknownOperation { .. } => {
      McpError::new(ErrorCode::METHOD_NOT_FOUND, err.to_string(), Some(err.detail()))
    }
    ProtocolError::InvalidArguments { .. } => McpError::invalid_params(err.to_string(), Some(err.detail())),
  }
}

/// Serve `dispatcher` over stdin/stdout until the client disconnects.
pub async fn run_stdio_server(dispatcher: Arc<ToolDispatcher>) -> anyhow::Result<()> {
  let server = PkgwatchServer::new(dispatcher);
  info!(tools = server.tools().len(), "serving MCP over stdio");

  let service = server
    .serve(stdio())
    .await
    .context("failed to start stdio MCP server")?;
  service
    .waiting()
    .await
    .context("stdio MCP server task join failed")?;

  info!("MCP client disconnected");
  Ok(())
}
