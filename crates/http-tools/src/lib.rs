//! HTTP test client for swagger-mcp.
//!
//! Builds concrete requests from a path template plus parameter maps, executes them with a
//! timeout, and renders the equivalent cURL command from the same URL construction.
//!
//! Execution never fails at the API boundary: transport errors come back as a status-0
//! [`runtime::ApiResponse`].

pub mod request;
pub mod runtime;
pub mod safety;
pub mod semantics;
