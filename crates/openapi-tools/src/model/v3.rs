//! OpenAPI 3.0 / 3.1 document model (the subset used for introspection).

use super::{
    Info, OperationMeta, PathItem, SecurityRequirement, Tag, lenient_string, without_extensions,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiV3 {
    #[serde(deserialize_with = "lenient_string")]
    pub openapi: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default, deserialize_with = "without_extensions")]
    pub paths: IndexMap<String, PathItem<Operation, Parameter>>,
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub variables: IndexMap<String, ServerVariable>,
}

impl Server {
    /// The server URL with every `{variable}` replaced by its declared default.
    #[must_use]
    pub fn expanded_url(&self) -> String {
        self.variables
            .iter()
            .fold(self.url.clone(), |url, (name, var)| {
                url.replace(&format!("{{{name}}}"), &var.default)
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerVariable {
    #[serde(default, deserialize_with = "lenient_string")]
    pub default: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(flatten)]
    pub meta: OperationMeta,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    #[serde(default, deserialize_with = "without_extensions")]
    pub responses: IndexMap<String, Response>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: String,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}
