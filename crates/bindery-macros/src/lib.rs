//! Procedural macros for bindery.
//!
//! - `#[derive(JsonSchema)]` describes a struct or fieldless enum and
//!   generates its JSON Schema.
//! - `#[derive(RequestShape)]` turns a struct whose fields carry
//!   `#[bind("location=key")]` annotations into a bindable request shape.
//!
//! Generated code refers to `::bindery_types`, `::bindery_openapi` and
//! `::bindery_core`, which must be dependencies of the crate using the
//! derives (the `bindery` facade pulls in all three).

use proc_macro::TokenStream;

mod openapi;
mod rename;
mod shape;

/// Derive `Describe` and `JsonSchema`.
///
/// Field attributes: `#[schema(xml = "...", form = "...", format = "...",
/// nullable, skip)]`; `#[serde(rename = "...")]`, `#[serde(skip)]` and the
/// container's `#[serde(rename_all = "...")]` are honored.
#[proc_macro_derive(JsonSchema, attributes(schema))]
pub fn derive_json_schema(input: TokenStream) -> TokenStream {
    openapi::derive_json_schema_impl(input)
}

/// Derive `RequestShape`.
///
/// Annotated fields (`#[bind("path=id")]`, `#[bind("req=body")]`, ...) are
/// bound from the request; unannotated fields must themselves be request
/// shapes and are bound field by field in place.
#[proc_macro_derive(RequestShape, attributes(bind))]
pub fn derive_request_shape(input: TokenStream) -> TokenStream {
    shape::derive_request_shape_impl(input)
}
