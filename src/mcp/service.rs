//! MCP service implementation using rmcp.
//!
//! The tool set is a runtime-composed registry rather than a fixed set of
//! methods, so `ServerHandler` is implemented directly: `list_tools`
//! advertises the registry descriptors and `call_tool` routes through the
//! dispatcher. Error normalization lives in `From<CrmError> for ErrorData`,
//! keeping this layer a thin adapter.

use crate::tools::dispatcher::{ContentBlock, Dispatcher};
use crate::tools::registry::JsonObject;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool as McpTool,
    },
    service::{RequestContext, RoleServer},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct CrmService {
    /// Shared dispatcher owning the registry and the database client
    dispatcher: Arc<Dispatcher>,
}

impl CrmService {
    /// Create a new CrmService over a shared dispatcher.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl ServerHandler for CrmService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "crm-mcp-server".to_owned(),
                title: Some("CRM MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "CRM database tools for automation agents.\n\
                \n\
                ## Workflow\n\
                1. Call `tools/list` to see the available operations and their input schemas\n\
                2. Invoke a tool by name with a JSON argument object\n\
                3. List tools accept optional filters plus `limit`/`offset` paging\n\
                \n\
                ## Entities\n\
                - Customers: `list_customers`, `get_customer`, `create_customer`\n\
                - Invoices: `list_invoices`, `get_invoice`, `create_invoice`\n\
                - Projects: `list_projects`, `get_project`\n\
                - Tasks: `list_tasks`, `get_task`, `create_task`, `update_task_status`\n\
                - Leads: `list_leads`, `get_lead`, `create_lead`\n\
                \n\
                ## Errors\n\
                Unknown tool names and missing entities return not-found errors; invalid\n\
                arguments return invalid-params errors naming the offending field."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self
            .dispatcher
            .registry()
            .tools()
            .iter()
            .map(|tool| {
                McpTool::new(tool.name, tool.description, tool.input_schema.clone())
            })
            .collect();

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args: JsonObject = request.arguments.unwrap_or_default();
        let response = self.dispatcher.invoke(&request.name, args).await?;

        let content = response
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => Content::text(text),
            })
            .collect();

        Ok(CallToolResult::success(content))
    }
}
