//! MCP protocol handler.

use crate::context::ServiceContext;
use crate::{resources, tools};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ErrorData, Implementation, ListResourcesResult,
    ListToolsResult, PaginatedRequestParams, ProtocolVersion, ReadResourceRequestParams,
    ReadResourceResult, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use std::sync::Arc;
use tracing::{debug, info};

const INSTRUCTIONS: &str = "Explore and exercise APIs described by Swagger 2.0 / OpenAPI 3.x \
documents.\n\
1) Call swagger_list_services to see configured aliases.\n\
2) Call swagger_select_service with an alias, URL or file path.\n\
3) Use swagger_list_endpoints / swagger_search / swagger_get_endpoint / swagger_get_schema to \
inspect the API.\n\
4) Use swagger_test to send a request, swagger_curl for a shell command, or \
swagger_generate_code for a client function.";

#[derive(Clone)]
pub struct SwaggerMcpServer {
    ctx: Arc<ServiceContext>,
    tools: Arc<Vec<Tool>>,
}

impl SwaggerMcpServer {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            tools: Arc::new(tools::catalogue()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    async fn handle_call(&self, request: CallToolRequestParams) -> Result<CallToolResult, ErrorData> {
        let Some(tool) = self.tools.iter().find(|t| t.name == request.name) else {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ));
        };
        debug!(tool = %tool.name, "tools/call");
        Ok(tools::call_tool(&self.ctx, tool, request.arguments).await)
    }
}

impl ServerHandler for SwaggerMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "swagger-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Swagger / OpenAPI MCP".to_string()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tools.as_ref().clone(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        self.handle_call(request)
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            resources: resources::catalogue(),
            ..Default::default()
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, ErrorData>> + Send + '_ {
        async move {
            debug!(uri = %request.uri, "resources/read");
            resources::read(&self.ctx, &request.uri).await
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the transport fails to initialize or the session ends abnormally.
pub async fn serve_stdio(server: SwaggerMcpServer) -> anyhow::Result<()> {
    use rmcp::ServiceExt as _;

    let service = server.serve(rmcp::transport::stdio()).await?;
    info!("MCP session initialized on stdio");
    let reason = service.waiting().await?;
    info!(?reason, "MCP session ended");
    Ok(())
}
