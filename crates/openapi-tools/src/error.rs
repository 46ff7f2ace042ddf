//! Error types for `swagger-mcp-openapi-tools`.

use thiserror::Error;

/// Main error type for spec loading and introspection.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Network failure or non-success status while fetching a spec.
    #[error("failed to fetch spec from '{url}': {message}")]
    SpecFetch { url: String, message: String },

    #[error("failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The body is neither valid JSON nor valid YAML.
    #[error("failed to parse spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Valid JSON/YAML that does not have the shape of its declared dialect.
    #[error("malformed {dialect} document '{location}': {message}")]
    SpecShape {
        location: String,
        dialect: &'static str,
        message: String,
    },

    /// `$ref` resolution failed (dangling pointer, unreachable document, rejected cycle).
    #[error("unresolvable $ref '{reference}' in {location}: {message}")]
    SpecRef {
        reference: String,
        location: String,
        message: String,
    },

    /// Neither `openapi` nor `swagger` is present at the document root.
    #[error("Unknown OpenAPI specification format (no 'openapi' or 'swagger' field) in '{0}'")]
    UnsupportedSpec(String),

    /// Endpoint or schema lookup miss.
    #[error("{0}")]
    NotFound(String),

    /// No usable base URL could be derived.
    #[error("cannot determine base URL: {0}")]
    BaseUrl(String),
}

impl OpenApiToolsError {
    /// True for the fetch/parse family (source unreachable or unparseable).
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            OpenApiToolsError::SpecFetch { .. }
                | OpenApiToolsError::SpecReadFile { .. }
                | OpenApiToolsError::SpecParse { .. }
                | OpenApiToolsError::SpecShape { .. }
        )
    }
}

/// Result type alias for spec tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
