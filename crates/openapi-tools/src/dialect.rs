//! Version-independent accessors over a resolved [`Document`].

use crate::error::{OpenApiToolsError, Result};
use crate::model::{ApiSpec, Dialect, Info, Tag};
use crate::resolver::Document;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Headline facts about a service, as shown on selection and in `current/info`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `"OpenAPI 3.0.3"` / `"Swagger 2.0"`.
    pub spec_version: String,
    pub servers: Vec<String>,
    pub endpoint_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[must_use]
pub fn classify(doc: &Document) -> Dialect {
    doc.dialect()
}

/// # Errors
///
/// Returns [`OpenApiToolsError::UnsupportedSpec`] for documents of unknown dialect.
pub fn summarize(doc: &Document) -> Result<ApiSummary> {
    match &doc.spec {
        ApiSpec::OpenApiV3(spec) => Ok(build_summary(
            &spec.info,
            format!("OpenAPI {}", spec.openapi),
            spec.servers.iter().map(|s| s.url.clone()).collect(),
            spec.paths.values().map(|p| p.operations().count()).sum(),
            &spec.tags,
        )),
        ApiSpec::SwaggerV2(spec) => Ok(build_summary(
            &spec.info,
            format!("Swagger {}", spec.swagger),
            vec![spec.synthesized_server()],
            spec.paths.values().map(|p| p.operations().count()).sum(),
            &spec.tags,
        )),
        ApiSpec::Unsupported => Err(unsupported(doc)),
    }
}

fn build_summary(
    info: &Info,
    spec_version: String,
    servers: Vec<String>,
    endpoint_count: usize,
    tags: &[Tag],
) -> ApiSummary {
    ApiSummary {
        title: info.title.clone(),
        version: info.version.clone(),
        description: info.description.clone(),
        spec_version,
        servers,
        endpoint_count,
        tags: (!tags.is_empty()).then(|| tags.iter().map(|t| t.name.clone()).collect()),
    }
}

/// Named schemas: `components.schemas` (3.x) or `definitions` (2.0). Empty when absent.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::UnsupportedSpec`] for documents of unknown dialect.
pub fn schemas_of(doc: &Document) -> Result<&IndexMap<String, Value>> {
    match &doc.spec {
        ApiSpec::OpenApiV3(spec) => Ok(&spec.components.schemas),
        ApiSpec::SwaggerV2(spec) => Ok(&spec.definitions),
        ApiSpec::Unsupported => Err(unsupported(doc)),
    }
}

/// Base URL requests should go to when the caller did not supply one.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::BaseUrl`] when the document only has a relative server (or none)
/// and was not loaded from an `http(s)` URL.
pub fn extract_base_url(doc: &Document) -> Result<String> {
    match &doc.spec {
        ApiSpec::SwaggerV2(spec) => Ok(spec.synthesized_server()),
        ApiSpec::OpenApiV3(spec) => {
            let source_url = Url::parse(&doc.source)
                .ok()
                .filter(|u| matches!(u.scheme(), "http" | "https"));

            let Some(server) = spec.servers.first() else {
                return source_url
                    .map(|u| u.origin().ascii_serialization())
                    .ok_or_else(|| {
                        OpenApiToolsError::BaseUrl(
                            "the document declares no servers; pass an explicit baseUrl".to_string(),
                        )
                    });
            };

            let expanded = server.expanded_url();
            if Url::parse(&expanded).is_ok() {
                return Ok(expanded);
            }
            let Some(source_url) = source_url else {
                return Err(OpenApiToolsError::BaseUrl(format!(
                    "server URL '{expanded}' is relative and the spec was not loaded from a URL; \
                     pass an explicit baseUrl"
                )));
            };
            source_url
                .join(&expanded)
                .map(|u| u.to_string())
                .map_err(|e| {
                    OpenApiToolsError::BaseUrl(format!(
                        "cannot join server URL '{expanded}' onto '{source_url}': {e}"
                    ))
                })
        }
        ApiSpec::Unsupported => Err(unsupported(doc)),
    }
}

pub(crate) fn unsupported(doc: &Document) -> OpenApiToolsError {
    OpenApiToolsError::UnsupportedSpec(doc.source.clone())
}
