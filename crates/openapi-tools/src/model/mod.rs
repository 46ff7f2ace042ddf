//! Typed views of the two supported spec dialects.
//!
//! A resolved document is classified exactly once, when it is loaded, into [`ApiSpec`]. Code that
//! needs version-specific structure has to match on the variant, so there is no way to read a
//! Swagger 2.0 field from an OpenAPI 3.x document (or the other way round).
//!
//! Schema nodes stay as `serde_json::Value`: they are passed through to callers untouched.

pub mod v2;
pub mod v3;

use crate::error::{OpenApiToolsError, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use swagger_mcp_http_tools::semantics::HttpMethod;

/// `{scheme name -> required scopes}`.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenApiV3,
    SwaggerV2,
    Unknown,
}

#[derive(Debug, Clone)]
pub enum ApiSpec {
    OpenApiV3(Box<v3::OpenApiV3>),
    SwaggerV2(Box<v2::SwaggerV2>),
    Unsupported,
}

impl ApiSpec {
    /// Classify and type a fully dereferenced document.
    ///
    /// `openapi` is checked first; a document carrying both discriminants is treated as 3.x.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::SpecShape`] when the discriminant is present but the document
    /// does not match that dialect's structure.
    pub fn from_value(location: &str, value: Value) -> Result<Self> {
        if value.get("openapi").is_some() {
            let spec: v3::OpenApiV3 =
                serde_json::from_value(value).map_err(|e| OpenApiToolsError::SpecShape {
                    location: location.to_string(),
                    dialect: "OpenAPI 3.x",
                    message: e.to_string(),
                })?;
            return Ok(ApiSpec::OpenApiV3(Box::new(spec)));
        }
        if value.get("swagger").is_some() {
            let spec: v2::SwaggerV2 =
                serde_json::from_value(value).map_err(|e| OpenApiToolsError::SpecShape {
                    location: location.to_string(),
                    dialect: "Swagger 2.0",
                    message: e.to_string(),
                })?;
            return Ok(ApiSpec::SwaggerV2(Box::new(spec)));
        }
        Ok(ApiSpec::Unsupported)
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            ApiSpec::OpenApiV3(_) => Dialect::OpenApiV3,
            ApiSpec::SwaggerV2(_) => Dialect::SwaggerV2,
            ApiSpec::Unsupported => Dialect::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
}

/// Operation fields shared by both dialects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// A path item: up to seven operations plus parameters shared by all of them.
#[derive(Debug, Clone, Deserialize)]
pub struct PathItem<O, P> {
    pub get: Option<O>,
    pub post: Option<O>,
    pub put: Option<O>,
    pub delete: Option<O>,
    pub patch: Option<O>,
    pub options: Option<O>,
    pub head: Option<O>,
    #[serde(default = "Vec::new")]
    pub parameters: Vec<P>,
}

impl<O, P> PathItem<O, P> {
    #[must_use]
    pub fn operation(&self, method: HttpMethod) -> Option<&O> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// Present operations in canonical verb order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &O)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(|m| self.operation(m).map(|op| (m, op)))
    }
}

/// Version strings and titles are frequently written unquoted in YAML (`version: 1.0`).
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A name-keyed map (paths, responses) where `x-` vendor extension keys are dropped before the
/// remaining entries are decoded.
pub(crate) fn without_extensions<'de, D, T>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    IndexMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .filter(|(key, _)| !key.starts_with("x-"))
        .map(|(key, value)| {
            T::deserialize(value)
                .map(|entry| (key, entry))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_is_mutually_exclusive() {
        let v3 = ApiSpec::from_value("t", json!({"openapi": "3.0.3", "info": {}})).expect("v3");
        let v2 = ApiSpec::from_value("t", json!({"swagger": "2.0", "info": {}})).expect("v2");
        let both = ApiSpec::from_value("t", json!({"openapi": "3.1.0", "swagger": "2.0"}))
            .expect("both");
        let none = ApiSpec::from_value("t", json!({"info": {"title": "x"}})).expect("none");

        assert_eq!(v3.dialect(), Dialect::OpenApiV3);
        assert_eq!(v2.dialect(), Dialect::SwaggerV2);
        assert_eq!(both.dialect(), Dialect::OpenApiV3);
        assert_eq!(none.dialect(), Dialect::Unknown);
    }

    #[test]
    fn numeric_versions_are_accepted() {
        let spec = ApiSpec::from_value(
            "t",
            json!({"swagger": 2.0, "info": {"title": "T", "version": 1.5}}),
        )
        .expect("v2");
        let ApiSpec::SwaggerV2(doc) = spec else {
            panic!("expected swagger 2");
        };
        assert_eq!(doc.swagger, "2.0");
        assert_eq!(doc.info.version, "1.5");
    }

    #[test]
    fn wrong_shape_is_reported() {
        let err = ApiSpec::from_value("spec.json", json!({"openapi": "3.0.0", "paths": []}))
            .expect_err("paths must be a map");
        assert!(matches!(err, OpenApiToolsError::SpecShape { .. }));
    }

    #[test]
    fn path_item_iterates_operations_in_canonical_order() {
        let item: PathItem<Value, Value> = serde_json::from_value(json!({
            "head": {}, "get": {}, "delete": {}, "x-ext": 1
        }))
        .expect("path item");
        let methods: Vec<HttpMethod> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(
            methods,
            [HttpMethod::Get, HttpMethod::Delete, HttpMethod::Head]
        );
    }
}
