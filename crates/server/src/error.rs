//! Error types for the MCP server layer.

use swagger_mcp_openapi_tools::error::OpenApiToolsError;
use thiserror::Error;

/// Errors raised while handling a tool call or resource read.
///
/// Every variant renders to the user-facing message shown after `Error: ` in a tool result.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("No service selected. Use swagger_select_service first.")]
    NoSelection,

    /// Tool arguments rejected before any spec work was done.
    #[error("{0}")]
    InvalidParams(String),

    /// A spec-layer failure, prefixed with what the tool was doing.
    #[error("{context}: {source}")]
    Spec {
        context: &'static str,
        #[source]
        source: OpenApiToolsError,
    },

    /// Lookup misses are reported without a prefix.
    #[error("{0}")]
    NotFound(String),

    /// Another selection (or a clear) landed while this one was being validated.
    #[error("{context}: selection of '{source_name}' was superseded by a concurrent selection")]
    Superseded {
        context: &'static str,
        source_name: String,
    },

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServerError {
    /// Wrap a spec error; `NotFound` passes through unprefixed.
    #[must_use]
    pub fn spec(context: &'static str, source: OpenApiToolsError) -> Self {
        match source {
            OpenApiToolsError::NotFound(message) => ServerError::NotFound(message),
            source => ServerError::Spec { context, source },
        }
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
