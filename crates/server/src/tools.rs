//! The MCP tool surface: definitions, argument validation and dispatch.
//!
//! Every handler returns a JSON value that is rendered pretty-printed into a single text block.
//! Failures become `isError: true` results whose text is `Error: <message>`.

use crate::context::{ServiceContext, effective_base_url};
use crate::error::{Result, ServerError};
use crate::validation::validate_tool_arguments;
use indexmap::IndexMap;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool, ToolAnnotations};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use swagger_mcp_http_tools::request::{RequestSpec, generate_curl};
use swagger_mcp_http_tools::semantics::HttpMethod;
use swagger_mcp_openapi_tools::codegen::{self, HttpClientStyle, Language};
use swagger_mcp_openapi_tools::{dialect, extract};
use tracing::debug;

pub const SELECT_SERVICE: &str = "swagger_select_service";
pub const LIST_SERVICES: &str = "swagger_list_services";
pub const GET_CURRENT: &str = "swagger_get_current";
pub const CLEAR_SERVICE: &str = "swagger_clear_service";
pub const LIST_ENDPOINTS: &str = "swagger_list_endpoints";
pub const GET_ENDPOINT: &str = "swagger_get_endpoint";
pub const SEARCH: &str = "swagger_search";
pub const GET_SCHEMA: &str = "swagger_get_schema";
pub const LIST_SCHEMAS: &str = "swagger_list_schemas";
pub const TEST: &str = "swagger_test";
pub const CURL: &str = "swagger_curl";
pub const GENERATE_CODE: &str = "swagger_generate_code";

const NO_SERVICES_HINT: &str =
    "No services configured. Create swagger-targets.json in project root.";
const CURL_NOTE: &str = "Copy and paste this command into your terminal";
const SCHEMA_SUGGESTIONS: usize = 10;

#[derive(Clone, Copy)]
struct Hints {
    read_only: bool,
    destructive: bool,
    idempotent: bool,
    open_world: bool,
}

const INTROSPECTION: Hints = Hints {
    read_only: true,
    destructive: false,
    idempotent: true,
    open_world: false,
};

fn define(name: &str, title: &str, description: &str, schema: Value, hints: Hints) -> Tool {
    let schema_obj = schema.as_object().cloned().unwrap_or_else(JsonObject::new);
    let mut tool = Tool::new(name.to_string(), description.to_string(), Arc::new(schema_obj));
    tool.annotations = Some(ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: Some(hints.read_only),
        destructive_hint: Some(hints.destructive),
        idempotent_hint: Some(hints.idempotent),
        open_world_hint: Some(hints.open_world),
    });
    tool
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn method_enum(upper: bool) -> Value {
    let names: Vec<&str> = HttpMethod::ALL
        .iter()
        .map(|m| if upper { m.as_upper() } else { m.as_lower() })
        .collect();
    json!(names)
}

fn string_map(description: &str) -> Value {
    json!({
        "type": "object",
        "additionalProperties": {"type": "string"},
        "description": description,
    })
}

fn request_schema() -> Value {
    object_schema(
        json!({
            "method": {"type": "string", "enum": method_enum(true), "description": "HTTP method"},
            "path": {"type": "string", "minLength": 1, "description": "Endpoint path template, e.g. /users/{id}"},
            "pathParams": string_map("Values for {placeholders} in the path"),
            "queryParams": string_map("Query string parameters"),
            "headers": string_map("Request headers"),
            "body": {"description": "Request body; objects and arrays are sent as JSON"},
            "baseUrl": {"type": "string", "description": "Override the base URL for this request"},
        }),
        &["method", "path"],
    )
}

/// Every tool this server exposes, in listing order.
#[must_use]
pub fn catalogue() -> Vec<Tool> {
    vec![
        define(
            SELECT_SERVICE,
            "Select service",
            "Select a Swagger/OpenAPI service to work with. Can use an alias from \
             swagger-targets.json or a direct URL/file path. Must be called before using other tools.",
            object_schema(
                json!({"name": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Service alias from swagger-targets.json, or a spec URL/path"
                }}),
                &["name"],
            ),
            Hints {
                read_only: false,
                destructive: false,
                idempotent: true,
                open_world: true,
            },
        ),
        define(
            LIST_SERVICES,
            "List services",
            "List the services configured in swagger-targets.json and the currently selected source.",
            object_schema(
                json!({"reload": {
                    "type": "boolean",
                    "description": "Re-read swagger-targets.json before listing"
                }}),
                &[],
            ),
            INTROSPECTION,
        ),
        define(
            GET_CURRENT,
            "Current service",
            "Show information about the currently selected service.",
            object_schema(json!({}), &[]),
            INTROSPECTION,
        ),
        define(
            CLEAR_SERVICE,
            "Clear service",
            "Forget the current selection, optionally dropping its cached document.",
            object_schema(
                json!({"invalidateCache": {
                    "type": "boolean",
                    "description": "Also evict the selected document from the cache"
                }}),
                &[],
            ),
            Hints {
                read_only: false,
                destructive: false,
                idempotent: true,
                open_world: false,
            },
        ),
        define(
            LIST_ENDPOINTS,
            "List endpoints",
            "List all endpoints of the current service, optionally filtered by tag.",
            object_schema(
                json!({"tag": {"type": "string", "description": "Only endpoints with this tag"}}),
                &[],
            ),
            INTROSPECTION,
        ),
        define(
            GET_ENDPOINT,
            "Endpoint details",
            "Get parameters, request body, responses and security of one endpoint.",
            object_schema(
                json!({
                    "method": {"type": "string", "enum": method_enum(false), "description": "HTTP method (lower-case)"},
                    "path": {"type": "string", "minLength": 1, "description": "Endpoint path, e.g. /users/{id}"},
                }),
                &["method", "path"],
            ),
            INTROSPECTION,
        ),
        define(
            SEARCH,
            "Search endpoints",
            "Search endpoints by keyword in path, summary, description or operationId.",
            object_schema(
                json!({"keyword": {"type": "string", "minLength": 1, "description": "Case-insensitive search term"}}),
                &["keyword"],
            ),
            INTROSPECTION,
        ),
        define(
            GET_SCHEMA,
            "Get schema",
            "Get a named schema definition (components.schemas or definitions).",
            object_schema(
                json!({"schemaName": {"type": "string", "minLength": 1, "description": "Schema name"}}),
                &["schemaName"],
            ),
            INTROSPECTION,
        ),
        define(
            LIST_SCHEMAS,
            "List schemas",
            "List the names of all schemas defined by the current service.",
            object_schema(json!({}), &[]),
            INTROSPECTION,
        ),
        define(
            TEST,
            "Test endpoint",
            "Execute an HTTP request against the current service and report the response.",
            request_schema(),
            Hints {
                read_only: false,
                destructive: true,
                idempotent: false,
                open_world: true,
            },
        ),
        define(
            CURL,
            "Generate cURL",
            "Generate a cURL command for an endpoint of the current service without sending it.",
            request_schema(),
            INTROSPECTION,
        ),
        define(
            GENERATE_CODE,
            "Generate client code",
            "Generate a TypeScript or JavaScript client function for an endpoint.",
            object_schema(
                json!({
                    "method": {"type": "string", "enum": method_enum(false), "description": "HTTP method (lower-case)"},
                    "path": {"type": "string", "minLength": 1, "description": "Endpoint path"},
                    "language": {"type": "string", "enum": ["typescript", "javascript"], "default": "typescript"},
                    "httpClient": {"type": "string", "enum": ["axios", "fetch"], "default": "axios"},
                }),
                &["method", "path"],
            ),
            INTROSPECTION,
        ),
    ]
}

/// Validate `arguments` against `tool` and run it. Never fails at the protocol level.
pub async fn call_tool(
    ctx: &ServiceContext,
    tool: &Tool,
    arguments: Option<JsonObject>,
) -> CallToolResult {
    let args = Value::Object(arguments.unwrap_or_default());
    if let Err(message) = validate_tool_arguments(tool, &args) {
        debug!(tool = %tool.name, %message, "rejected tool arguments");
        return error_result(&message);
    }

    match dispatch(ctx, &tool.name, args).await {
        Ok(value) => success_result(&value),
        Err(e) => {
            debug!(tool = %tool.name, error = %e, "tool call failed");
            error_result(&e.to_string())
        }
    }
}

async fn dispatch(ctx: &ServiceContext, name: &str, args: Value) -> Result<Value> {
    match name {
        SELECT_SERVICE => select_service(ctx, parse(args)?).await,
        LIST_SERVICES => Ok(list_services(ctx, &parse(args)?)),
        GET_CURRENT => get_current(ctx).await,
        CLEAR_SERVICE => Ok(clear_service(ctx, &parse(args)?)),
        LIST_ENDPOINTS => list_endpoints(ctx, parse(args)?).await,
        GET_ENDPOINT => get_endpoint(ctx, parse(args)?).await,
        SEARCH => search(ctx, parse(args)?).await,
        GET_SCHEMA => get_schema(ctx, parse(args)?).await,
        LIST_SCHEMAS => list_schemas(ctx).await,
        TEST => test_endpoint(ctx, parse(args)?).await,
        CURL => curl(ctx, parse(args)?).await,
        GENERATE_CODE => generate_code(ctx, parse(args)?).await,
        other => Err(ServerError::InvalidParams(format!("Unknown tool: {other}"))),
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| ServerError::InvalidParams(format!("Invalid params: {e}")))
}

fn parse_method(raw: &str) -> Result<HttpMethod> {
    raw.parse()
        .map_err(|e| ServerError::InvalidParams(format!("Invalid params: {e}")))
}

fn success_result(value: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

fn error_result(message: &str) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error: {message}"))])
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[derive(Deserialize)]
struct SelectArgs {
    name: String,
}

async fn select_service(ctx: &ServiceContext, args: SelectArgs) -> Result<Value> {
    let selected = ctx.select(&args.name).await?;
    let selection = &selected.selection;
    let summary = &selected.summary;
    let message = match &selection.alias {
        Some(alias) => format!("Connected to \"{alias}\" service"),
        None => "Connected to direct URL".to_string(),
    };
    Ok(json!({
        "message": message,
        "source": selection.source,
        "isAlias": selection.alias.is_some(),
        "aliasName": selection.alias,
        "baseUrl": selection.base_url_override,
        "api": {
            "title": summary.title,
            "version": summary.version,
            "description": summary.description,
            "specVersion": summary.spec_version,
            "endpointCount": summary.endpoint_count,
            "tags": summary.tags,
        },
    }))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListServicesArgs {
    reload: bool,
}

fn list_services(ctx: &ServiceContext, args: &ListServicesArgs) -> Value {
    let config = if args.reload {
        ctx.config().reload()
    } else {
        ctx.config().current()
    };
    let services = if config.is_empty() {
        json!(NO_SERVICES_HINT)
    } else {
        json!(config.targets().collect::<Vec<_>>())
    };
    json!({
        "currentSource": ctx.session().current().map(|s| s.source.clone()),
        "services": services,
    })
}

async fn get_current(ctx: &ServiceContext) -> Result<Value> {
    const CONTEXT: &str = "Failed to get current service info";
    let (selection, doc) = ctx.current_document(CONTEXT).await?;
    let summary = dialect::summarize(&doc).map_err(|e| ServerError::spec(CONTEXT, e))?;

    let mut out = json!({
        "source": selection.source,
        "baseUrl": selection.base_url_override,
    });
    if let (Value::Object(out), Value::Object(summary)) = (&mut out, to_json(&summary)) {
        out.extend(summary);
    }
    Ok(out)
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ClearArgs {
    invalidate_cache: bool,
}

fn clear_service(ctx: &ServiceContext, args: &ClearArgs) -> Value {
    let previous = ctx.session().clear();
    if args.invalidate_cache
        && let Some(previous) = &previous
    {
        ctx.store().invalidate(Some(&previous.source));
    }
    let message = if previous.is_some() {
        "Service selection cleared"
    } else {
        "No service was selected"
    };
    json!({
        "message": message,
        "previousSource": previous.map(|p| p.source.clone()),
    })
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListEndpointsArgs {
    tag: Option<String>,
}

async fn list_endpoints(ctx: &ServiceContext, args: ListEndpointsArgs) -> Result<Value> {
    const CONTEXT: &str = "Failed to list endpoints";
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let tag = args.tag.filter(|t| !t.is_empty());
    let endpoints =
        extract::list_endpoints(&doc, tag.as_deref()).map_err(|e| ServerError::spec(CONTEXT, e))?;
    Ok(json!({
        "total": endpoints.len(),
        "tag": tag,
        "endpoints": endpoints,
    }))
}

#[derive(Deserialize)]
struct EndpointArgs {
    method: String,
    path: String,
}

async fn get_endpoint(ctx: &ServiceContext, args: EndpointArgs) -> Result<Value> {
    const CONTEXT: &str = "Failed to get endpoint";
    let method = parse_method(&args.method)?;
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let detail = extract::get_endpoint_detail(&doc, method, &args.path)
        .map_err(|e| ServerError::spec(CONTEXT, e))?;
    Ok(to_json(&detail))
}

#[derive(Deserialize)]
struct SearchArgs {
    keyword: String,
}

async fn search(ctx: &ServiceContext, args: SearchArgs) -> Result<Value> {
    const CONTEXT: &str = "Failed to search";
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let endpoints =
        extract::search_endpoints(&doc, &args.keyword).map_err(|e| ServerError::spec(CONTEXT, e))?;
    Ok(json!({
        "keyword": args.keyword,
        "total": endpoints.len(),
        "endpoints": endpoints,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaArgs {
    schema_name: String,
}

async fn get_schema(ctx: &ServiceContext, args: SchemaArgs) -> Result<Value> {
    const CONTEXT: &str = "Failed to get schema";
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let schemas = dialect::schemas_of(&doc).map_err(|e| ServerError::spec(CONTEXT, e))?;
    match schemas.get(&args.schema_name) {
        Some(schema) => Ok(json!({ "name": args.schema_name, "schema": schema })),
        None => Err(ServerError::NotFound(schema_not_found(
            &args.schema_name,
            schemas.keys().map(String::as_str),
        ))),
    }
}

fn schema_not_found<'a>(name: &str, available: impl ExactSizeIterator<Item = &'a str>) -> String {
    let total = available.len();
    if total == 0 {
        return format!("Schema \"{name}\" not found. Available: (none)");
    }
    let shown: Vec<&str> = available.take(SCHEMA_SUGGESTIONS).collect();
    let more = if total > SCHEMA_SUGGESTIONS { "..." } else { "" };
    format!(
        "Schema \"{name}\" not found. Available: {}{more}",
        shown.join(", ")
    )
}

async fn list_schemas(ctx: &ServiceContext) -> Result<Value> {
    const CONTEXT: &str = "Failed to list schemas";
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let schemas = dialect::schemas_of(&doc).map_err(|e| ServerError::spec(CONTEXT, e))?;
    let names: Vec<&String> = schemas.keys().collect();
    Ok(json!({ "total": names.len(), "schemas": names }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestArgs {
    method: String,
    path: String,
    #[serde(default)]
    path_params: IndexMap<String, String>,
    #[serde(default)]
    query_params: IndexMap<String, String>,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    base_url: Option<String>,
}

async fn build_request(
    ctx: &ServiceContext,
    args: RequestArgs,
    context: &'static str,
) -> Result<RequestSpec> {
    let method = parse_method(&args.method)?;
    let (selection, doc) = ctx.current_document(context).await?;
    let base_url = effective_base_url(args.base_url.as_deref(), &selection, &doc)
        .map_err(|e| ServerError::spec(context, e))?;

    let mut spec = RequestSpec::new(base_url, method, args.path);
    spec.path_params = args.path_params;
    spec.query_params = args.query_params;
    spec.headers = args.headers;
    spec.body = args.body;
    Ok(spec)
}

async fn test_endpoint(ctx: &ServiceContext, args: RequestArgs) -> Result<Value> {
    let spec = build_request(ctx, args, "Request failed").await?;
    let response = ctx.http().execute(&spec).await;
    Ok(json!({
        "request": {
            "method": spec.method.as_upper(),
            "path": spec.path,
            "baseUrl": spec.base_url,
        },
        "response": {
            "status": response.status,
            "statusText": response.status_text,
            "headers": response.headers,
            "body": response.body,
            "duration": format!("{}ms", response.duration_ms),
        },
        "curl": response.curl,
    }))
}

async fn curl(ctx: &ServiceContext, args: RequestArgs) -> Result<Value> {
    let spec = build_request(ctx, args, "Failed to generate cURL").await?;
    Ok(json!({ "curl": generate_curl(&spec), "note": CURL_NOTE }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateArgs {
    method: String,
    path: String,
    #[serde(default)]
    language: Language,
    #[serde(default)]
    http_client: HttpClientStyle,
}

async fn generate_code(ctx: &ServiceContext, args: GenerateArgs) -> Result<Value> {
    const CONTEXT: &str = "Failed to generate code";
    let method = parse_method(&args.method)?;
    let (_, doc) = ctx.current_document(CONTEXT).await?;
    let detail = extract::get_endpoint_detail(&doc, method, &args.path)
        .map_err(|e| ServerError::spec(CONTEXT, e))?;
    Ok(to_json(&codegen::generate(&detail, args.language, args.http_client)))
}
