//! Swagger 2.0 document model (the subset used for introspection).

use super::{
    Info, OperationMeta, PathItem, SecurityRequirement, Tag, lenient_string, without_extensions,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerV2 {
    #[serde(deserialize_with = "lenient_string")]
    pub swagger: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default, deserialize_with = "without_extensions")]
    pub paths: IndexMap<String, PathItem<Operation, Parameter>>,
    #[serde(default)]
    pub definitions: IndexMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

impl SwaggerV2 {
    /// `scheme://host` + basePath with `http`, `localhost` and `""` as defaults.
    #[must_use]
    pub fn synthesized_server(&self) -> String {
        format!(
            "{}://{}{}",
            self.schemes.first().map_or("http", String::as_str),
            self.host.as_deref().unwrap_or("localhost"),
            self.base_path.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub meta: OperationMeta,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, deserialize_with = "without_extensions")]
    pub responses: IndexMap<String, Response>,
}

/// A Swagger 2.0 parameter. `in: body` parameters carry `schema`; all others carry inline
/// `type`/`format`/`enum`.
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
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default)]
    pub schema: Option<Value>,
}

impl Parameter {
    #[must_use]
    pub fn is_body(&self) -> bool {
        self.location == "body"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub examples: IndexMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> SwaggerV2 {
        serde_json::from_value(v).expect("swagger doc")
    }

    #[test]
    fn synthesized_server_uses_defaults() {
        let d = doc(json!({"swagger": "2.0"}));
        assert_eq!(d.synthesized_server(), "http://localhost");
    }

    #[test]
    fn synthesized_server_uses_first_scheme_host_and_base_path() {
        let d = doc(json!({
            "swagger": "2.0",
            "schemes": ["https", "http"],
            "host": "api.example.com",
            "basePath": "/v2"
        }));
        assert_eq!(d.synthesized_server(), "https://api.example.com/v2");
    }

    #[test]
    fn vendor_extension_keys_are_skipped() {
        let d = doc(json!({
            "swagger": "2.0",
            "paths": {
                "x-internal": true,
                "/items": {"get": {"responses": {
                    "200": {"description": "ok"},
                    "x-ratelimit": 10
                }}}
            }
        }));
        assert_eq!(d.paths.keys().collect::<Vec<_>>(), ["/items"]);
        let op = d.paths["/items"].get.as_ref().expect("get");
        assert_eq!(op.responses.keys().collect::<Vec<_>>(), ["200"]);
    }
}
