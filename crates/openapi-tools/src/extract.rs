//! Endpoint listing, search and per-endpoint detail.
//!
//! Both dialects are projected into one model here. Everything is recomputed from the resolved
//! document on each call; the document itself is never modified.

use crate::dialect::unsupported;
use crate::error::{OpenApiToolsError, Result};
use crate::model::{ApiSpec, OperationMeta, PathItem, SecurityRequirement, v2, v3};
use crate::resolver::Document;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use swagger_mcp_http_tools::request::CONTENT_TYPE_JSON;
use swagger_mcp_http_tools::semantics::HttpMethod;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
}

impl EndpointSummary {
    fn new(method: HttpMethod, path: &str, meta: &OperationMeta) -> Self {
        Self {
            method,
            path: path.to_string(),
            operation_id: meta.operation_id.clone(),
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            tags: meta.tags.clone(),
            deprecated: meta.deprecated,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        hit(&self.path)
            || self.summary.as_deref().is_some_and(hit)
            || self.description.as_deref().is_some_and(hit)
            || self.operation_id.as_deref().is_some_and(hit)
            || self.tags.iter().any(|t| hit(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDetail {
    #[serde(flatten)]
    pub summary: EndpointSummary,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, ResponseSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// A non-body parameter. `location` is `path`, `query`, `header`, `cookie` or (2.0) `formData`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaTypeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaTypeSpec>,
}

impl RequestBody {
    /// Schema of the `application/json` media type, if declared.
    #[must_use]
    pub fn json_schema(&self) -> Option<&Value> {
        self.content
            .get(CONTENT_TYPE_JSON)
            .and_then(|m| m.schema.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaTypeSpec>,
}

impl ResponseSpec {
    #[must_use]
    pub fn json_schema(&self) -> Option<&Value> {
        self.content
            .get(CONTENT_TYPE_JSON)
            .and_then(|m| m.schema.as_ref())
    }
}

trait HasMeta {
    fn meta(&self) -> &OperationMeta;
}

impl HasMeta for v3::Operation {
    fn meta(&self) -> &OperationMeta {
        &self.meta
    }
}

impl HasMeta for v2::Operation {
    fn meta(&self) -> &OperationMeta {
        &self.meta
    }
}

fn summaries<O: HasMeta, P>(
    paths: &IndexMap<String, PathItem<O, P>>,
    tag: Option<&str>,
) -> Vec<EndpointSummary> {
    paths
        .iter()
        .flat_map(|(path, item)| {
            item.operations()
                .map(move |(method, op)| (method, path.as_str(), op.meta()))
        })
        .filter(|(_, _, meta)| tag.is_none_or(|t| meta.tags.iter().any(|x| x == t)))
        .map(|(method, path, meta)| EndpointSummary::new(method, path, meta))
        .collect()
}

/// Every operation, in path order and then canonical verb order; optionally only those carrying
/// `tag` (exact, case-sensitive).
///
/// # Errors
///
/// Returns [`OpenApiToolsError::UnsupportedSpec`] for documents of unknown dialect.
pub fn list_endpoints(doc: &Document, tag: Option<&str>) -> Result<Vec<EndpointSummary>> {
    match &doc.spec {
        ApiSpec::OpenApiV3(spec) => Ok(summaries(&spec.paths, tag)),
        ApiSpec::SwaggerV2(spec) => Ok(summaries(&spec.paths, tag)),
        ApiSpec::Unsupported => Err(unsupported(doc)),
    }
}

/// Case-insensitive substring search over path, summary, description, operationId and tags.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::UnsupportedSpec`] for documents of unknown dialect.
pub fn search_endpoints(doc: &Document, keyword: &str) -> Result<Vec<EndpointSummary>> {
    let needle = keyword.to_lowercase();
    Ok(list_endpoints(doc, None)?
        .into_iter()
        .filter(|e| e.matches(&needle))
        .collect())
}

/// Full detail for the operation at exactly `method` + `path` (the templated document key).
///
/// # Errors
///
/// Returns [`OpenApiToolsError::NotFound`] when there is no such operation, or
/// [`OpenApiToolsError::UnsupportedSpec`] for documents of unknown dialect.
pub fn get_endpoint_detail(doc: &Document, method: HttpMethod, path: &str) -> Result<EndpointDetail> {
    let not_found = || {
        OpenApiToolsError::NotFound(format!("Endpoint not found: {} {path}", method.as_upper()))
    };
    match &doc.spec {
        ApiSpec::OpenApiV3(spec) => {
            let item = spec.paths.get(path).ok_or_else(not_found)?;
            let op = item.operation(method).ok_or_else(not_found)?;
            Ok(v3_detail(method, path, item, op, spec.security.as_ref()))
        }
        ApiSpec::SwaggerV2(spec) => {
            let item = spec.paths.get(path).ok_or_else(not_found)?;
            let op = item.operation(method).ok_or_else(not_found)?;
            Ok(v2_detail(method, path, item, op, spec.security.as_ref()))
        }
        ApiSpec::Unsupported => Err(unsupported(doc)),
    }
}

fn effective_security(
    meta: &OperationMeta,
    document_level: Option<&Vec<SecurityRequirement>>,
) -> Option<Vec<SecurityRequirement>> {
    meta.security.clone().or_else(|| document_level.cloned())
}

fn v3_detail(
    method: HttpMethod,
    path: &str,
    item: &PathItem<v3::Operation, v3::Parameter>,
    op: &v3::Operation,
    document_security: Option<&Vec<SecurityRequirement>>,
) -> EndpointDetail {
    let parameters = item
        .parameters
        .iter()
        .chain(&op.parameters)
        .map(v3_parameter)
        .collect();

    let request_body = op.request_body.as_ref().map(|rb| RequestBody {
        description: rb.description.clone(),
        required: rb.required,
        content: v3_content(&rb.content),
    });

    let responses = op
        .responses
        .iter()
        .map(|(status, r)| {
            (
                status.clone(),
                ResponseSpec {
                    description: r.description.clone(),
                    content: v3_content(&r.content),
                },
            )
        })
        .collect();

    EndpointDetail {
        summary: EndpointSummary::new(method, path, &op.meta),
        parameters,
        request_body,
        responses,
        security: effective_security(&op.meta, document_security),
    }
}

fn v3_content(content: &IndexMap<String, v3::MediaType>) -> IndexMap<String, MediaTypeSpec> {
    content
        .iter()
        .map(|(media, m)| {
            (
                media.clone(),
                MediaTypeSpec {
                    schema: m.schema.clone(),
                    example: m.example.clone(),
                },
            )
        })
        .collect()
}

fn v3_parameter(p: &v3::Parameter) -> Parameter {
    let schema = p.schema.as_ref();
    let field = |key: &str| schema.and_then(|s| s.get(key));
    Parameter {
        name: p.name.clone(),
        location: p.location.clone(),
        required: p.required,
        description: p.description.clone(),
        type_name: field("type").and_then(schema_type_name),
        format: field("format").and_then(Value::as_str).map(str::to_string),
        default: field("default").cloned(),
        example: p.example.clone().or_else(|| field("example").cloned()),
        enum_values: field("enum").and_then(Value::as_array).cloned(),
    }
}

/// `"string"`, or the first non-null member of a 3.1 type array (`["string", "null"]`).
fn schema_type_name(ty: &Value) -> Option<String> {
    match ty {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => None,
    }
}

fn v2_detail(
    method: HttpMethod,
    path: &str,
    item: &PathItem<v2::Operation, v2::Parameter>,
    op: &v2::Operation,
    document_security: Option<&Vec<SecurityRequirement>>,
) -> EndpointDetail {
    let all_params = || item.parameters.iter().chain(&op.parameters);

    // Operation-level parameters override path-level ones, so the last body declaration wins.
    let request_body = all_params().rev().find(|p| p.is_body()).map(|p| RequestBody {
        description: p.description.clone(),
        required: p.required,
        content: IndexMap::from([(
            CONTENT_TYPE_JSON.to_string(),
            MediaTypeSpec {
                schema: p.schema.clone(),
                example: None,
            },
        )]),
    });

    let parameters = all_params()
        .filter(|p| !p.is_body())
        .map(|p| Parameter {
            name: p.name.clone(),
            location: p.location.clone(),
            required: p.required,
            description: p.description.clone(),
            type_name: p.type_name.clone(),
            format: p.format.clone(),
            default: p.default.clone(),
            example: None,
            enum_values: p.enum_values.clone(),
        })
        .collect();

    let responses = op
        .responses
        .iter()
        .map(|(status, r)| {
            let example = r.examples.get(CONTENT_TYPE_JSON).cloned();
            let content = if r.schema.is_some() || example.is_some() {
                IndexMap::from([(
                    CONTENT_TYPE_JSON.to_string(),
                    MediaTypeSpec {
                        schema: r.schema.clone(),
                        example,
                    },
                )])
            } else {
                IndexMap::new()
            };
            (
                status.clone(),
                ResponseSpec {
                    description: r.description.clone(),
                    content,
                },
            )
        })
        .collect();

    EndpointDetail {
        summary: EndpointSummary::new(method, path, &op.meta),
        parameters,
        request_body,
        responses,
        security: effective_security(&op.meta, document_security),
    }
}
