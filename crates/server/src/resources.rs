//! Read-only JSON resources describing the configured and selected services.

use crate::context::ServiceContext;
use crate::error::ServerError;
use rmcp::ErrorData;
use rmcp::model::{Annotated, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde_json::{Value, json};
use swagger_mcp_openapi_tools::dialect;
use swagger_mcp_openapi_tools::extract;

pub const SERVICES_URI: &str = "swagger://services";
pub const CURRENT_INFO_URI: &str = "swagger://current/info";
pub const CURRENT_ENDPOINTS_URI: &str = "swagger://current/endpoints";
pub const CURRENT_SCHEMAS_URI: &str = "swagger://current/schemas";

const JSON_MIME: &str = "application/json";

fn resource(uri: &str, name: &str, description: &str) -> Resource {
    let mut raw = RawResource::new(uri.to_string(), name.to_string());
    raw.description = Some(description.to_string());
    raw.mime_type = Some(JSON_MIME.to_string());
    Annotated::new(raw, None)
}

#[must_use]
pub fn catalogue() -> Vec<Resource> {
    vec![
        resource(
            SERVICES_URI,
            "Available Services",
            "Services configured in swagger-targets.json",
        ),
        resource(
            CURRENT_INFO_URI,
            "Current Service Info",
            "Title, version, servers and tags of the selected service",
        ),
        resource(
            CURRENT_ENDPOINTS_URI,
            "Current Endpoints",
            "Every endpoint of the selected service",
        ),
        resource(
            CURRENT_SCHEMAS_URI,
            "Current Schemas",
            "Named schemas of the selected service with their property names",
        ),
    ]
}

/// Render the resource at `uri`. Domain failures are reported inside the JSON body.
///
/// # Errors
///
/// Returns `resource_not_found` for URIs outside the catalogue.
pub async fn read(ctx: &ServiceContext, uri: &str) -> Result<ReadResourceResult, ErrorData> {
    let body = match uri {
        SERVICES_URI => Ok(services(ctx)),
        CURRENT_INFO_URI => current_info(ctx).await,
        CURRENT_ENDPOINTS_URI => current_endpoints(ctx).await,
        CURRENT_SCHEMAS_URI => current_schemas(ctx).await,
        other => {
            return Err(ErrorData::resource_not_found(
                format!("Unknown resource: {other}"),
                None,
            ));
        }
    };
    let body = body.unwrap_or_else(|e| error_body(&e));
    let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(text, uri)],
    })
}

fn error_body(err: &ServerError) -> Value {
    match err {
        ServerError::NoSelection => json!({
            "error": "No service connected",
            "hint": "Use swagger_select_service to connect to a service first",
        }),
        other => json!({ "error": other.to_string() }),
    }
}

fn services(ctx: &ServiceContext) -> Value {
    let config = ctx.config().current();
    let services: Vec<_> = config.targets().collect();
    json!({
        "description": "Configured services from swagger-targets.json",
        "count": services.len(),
        "services": services,
        "usage": "Use swagger_select_service with any alias to connect",
    })
}

async fn current_info(ctx: &ServiceContext) -> Result<Value, ServerError> {
    const CONTEXT: &str = "Failed to get current service info";
    let (selection, doc) = ctx.current_document(CONTEXT).await?;
    let summary = dialect::summarize(&doc).map_err(|e| ServerError::spec(CONTEXT, e))?;
    let base_url = match &selection.base_url_override {
        Some(url) => Some(url.clone()),
        None => dialect::extract_base_url(&doc).ok(),
    };
    Ok(json!({
        "source": selection.source,
        "baseUrl": base_url,
        "title": summary.title,
        "version": summary.version,
        "description": summary.description,
        "specVersion": summary.spec_version,
        "endpointCount": summary.endpoint_count,
        "tags": summary.tags,
    }))
}

async fn current_endpoints(ctx: &ServiceContext) -> Result<Value, ServerError> {
    const CONTEXT: &str = "Failed to list endpoints";
    let (selection, doc) = ctx.current_document(CONTEXT).await?;
    let endpoints = extract::list_endpoints(&doc, None).map_err(|e| ServerError::spec(CONTEXT, e))?;
    let endpoints: Vec<Value> = endpoints
        .iter()
        .map(|e| {
            json!({
                "method": e.method.as_upper(),
                "path": e.path,
                "summary": e.summary,
                "tags": e.tags,
                "operationId": e.operation_id,
            })
        })
        .collect();
    Ok(json!({
        "source": selection.source,
        "count": endpoints.len(),
        "endpoints": endpoints,
    }))
}

async fn current_schemas(ctx: &ServiceContext) -> Result<Value, ServerError> {
    const CONTEXT: &str = "Failed to list schemas";
    let (selection, doc) = ctx.current_document(CONTEXT).await?;
    let schemas = dialect::schemas_of(&doc).map_err(|e| ServerError::spec(CONTEXT, e))?;
    let schemas: Vec<Value> = schemas
        .iter()
        .map(|(name, schema)| {
            let properties: Vec<&String> = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|p| p.keys().collect())
                .unwrap_or_default();
            json!({
                "name": name,
                "type": schema.get("type").and_then(Value::as_str).unwrap_or("object"),
                "description": schema.get("description").and_then(Value::as_str),
                "properties": properties,
            })
        })
        .collect();
    Ok(json!({
        "source": selection.source,
        "count": schemas.len(),
        "schemas": schemas,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLocator, ConfigStore};
    use crate::context::ContextOptions;

    const SWAGGER: &str = r##"{
        "swagger": "2.0",
        "info": {"title": "Legacy", "version": "2"},
        "host": "legacy.example.com",
        "basePath": "/api",
        "schemes": ["https"],
        "paths": {
            "/items": {"get": {"operationId": "listItems", "summary": "List", "tags": ["items"]}}
        },
        "definitions": {
            "Item": {"type": "object", "description": "An item", "properties": {"sku": {"type": "string"}}},
            "Tags": {"type": "array", "items": {"type": "string"}},
            "Loose": {"properties": {"x": {}}}
        }
    }"##;

    fn body(result: &ReadResourceResult) -> Value {
        let value = serde_json::to_value(result).expect("serialize");
        let text = value
            .pointer("/contents/0/text")
            .and_then(Value::as_str)
            .expect("text contents");
        serde_json::from_str(text).expect("json body")
    }

    fn context(dir: &std::path::Path) -> ServiceContext {
        std::fs::write(dir.join("legacy.json"), SWAGGER).expect("write spec");
        let config = dir.join("swagger-targets.json");
        std::fs::write(
            &config,
            r#"{"legacy": {"spec": "legacy.json", "baseUrl": "http://localhost:8080"}}"#,
        )
        .expect("write config");
        ServiceContext::new(
            ConfigStore::new(ConfigLocator::new(Some(config), None, None, None)),
            ContextOptions::default(),
        )
        .expect("context")
    }

    #[test]
    fn lists_four_json_resources() {
        let resources = catalogue();
        let uris: Vec<&str> = resources.iter().map(|r| r.raw.uri.as_str()).collect();
        assert_eq!(
            uris,
            [
                SERVICES_URI,
                CURRENT_INFO_URI,
                CURRENT_ENDPOINTS_URI,
                CURRENT_SCHEMAS_URI
            ]
        );
    }

    #[tokio::test]
    async fn reads_before_and_after_selection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path());

        let services = body(&read(&ctx, SERVICES_URI).await.expect("services"));
        assert_eq!(services["count"], 1);
        assert_eq!(services["services"][0]["alias"], "legacy");
        assert_eq!(services["services"][0]["baseUrl"], "http://localhost:8080");

        let info = body(&read(&ctx, CURRENT_INFO_URI).await.expect("info"));
        assert_eq!(info["error"], "No service connected");
        assert!(info["hint"].is_string());

        ctx.select("legacy").await.expect("select");

        let info = body(&read(&ctx, CURRENT_INFO_URI).await.expect("info"));
        assert_eq!(info["title"], "Legacy");
        assert_eq!(info["baseUrl"], "http://localhost:8080");
        assert_eq!(info["specVersion"], "Swagger 2.0");
        assert_eq!(info["endpointCount"], 1);

        let endpoints = body(&read(&ctx, CURRENT_ENDPOINTS_URI).await.expect("endpoints"));
        assert_eq!(endpoints["count"], 1);
        assert_eq!(
            endpoints["endpoints"][0],
            json!({"method": "GET", "path": "/items", "summary": "List",
                   "tags": ["items"], "operationId": "listItems"})
        );

        let schemas = body(&read(&ctx, CURRENT_SCHEMAS_URI).await.expect("schemas"));
        assert_eq!(schemas["count"], 3);
        assert_eq!(
            schemas["schemas"][0],
            json!({"name": "Item", "type": "object", "description": "An item", "properties": ["sku"]})
        );
        assert_eq!(schemas["schemas"][1]["type"], "array");
        assert_eq!(schemas["schemas"][2]["type"], "object");
        assert_eq!(schemas["schemas"][2]["description"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_uri_is_a_protocol_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path());
        assert!(read(&ctx, "swagger://nope").await.is_err());
    }
}
