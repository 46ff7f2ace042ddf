//! Swagger 2.0 / OpenAPI 3.x introspection.
//!
//! - [`resolver`]: fetch, dereference and cache spec documents
//! - [`dialect`]: dialect-independent summary, schemas and base URL
//! - [`extract`]: endpoint listing, search and detail
//! - [`codegen`]: client stub generation from endpoint detail

pub mod codegen;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod model;
pub mod resolver;
