//! MCP server exposing Swagger 2.0 / OpenAPI 3.x introspection, request testing and client code
//! generation as tools and resources.

pub mod config;
pub mod context;
pub mod error;
pub mod resources;
pub mod server;
pub mod session;
pub mod tools;
pub mod validation;
