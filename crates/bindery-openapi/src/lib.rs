//! OpenAPI 3.0 types and schema synthesis.
//!
//! This crate provides:
//!
//! - OpenAPI 3.0 document types
//! - JSON Schema types
//! - `JsonSchema` trait for compile-time schema generation
//! - Bounded schema naming and required-list synthesis
//! - [`DocumentBuilder`], which assembles operations, components and the
//!   shared error catalogue during route registration
//!
//! # Example
//!
//! ```ignore
//! use bindery_openapi::{DocumentBuilder, Info, JsonSchema};
//!
//! #[derive(JsonSchema)]
//! struct Item {
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut builder = DocumentBuilder::new(info);
//! let mut op = builder.operation(Method::Get, "/items/:id");
//! op.response(200, &Item::describe(), Item::schema, "application/json");
//! op.finish();
//! println!("{}", builder.build().to_yaml()?);
//! ```

#![forbid(unsafe_code)]

mod builder;
mod schema;
mod spec;
pub mod synth;

pub use builder::{
    DocumentBuilder, ERROR_RESPONSES, GENERIC_ERROR_SCHEMA, OperationBuilder,
    default_error_content_types, generic_error_schema, openapi_path,
};
pub use schema::{
    AnySchema, ArraySchema, JsonSchema, ObjectSchema, PrimitiveSchema, Reference, Schema,
    SchemaType,
};
pub use spec::{
    Components, DocumentError, Header, Info, MediaType, OPENAPI_VERSION, OpenApi, Operation,
    Parameter, ParameterLocation, PathItem, RequestBody, Response, SecurityRequirement,
    SecurityScheme, Server,
};
