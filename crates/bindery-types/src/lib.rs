//! Shared types for bindery.
//!
//! This crate sits at the bottom of the workspace and has no knowledge of
//! documents or requests. It provides:
//!
//! - [`Describe`] and [`TypeDescriptor`], the explicit replacement for runtime
//!   type introspection
//! - [`FieldBinding`], the parsed form of a field's `location=key;modifier`
//!   annotation
//! - [`Method`] and the [`mime`] constants both halves of the system agree on

#![forbid(unsafe_code)]

mod descriptor;
mod method;
pub mod mime;
mod tag;

pub use descriptor::{
    Describe, EnumDescriptor, FieldDescriptor, ScalarKind, StructDescriptor, TypeDescriptor,
    Wrapper, generic_name,
};
pub use method::{Method, ParseMethodError};
pub use mime::NamingConvention;
pub use tag::{AuthScheme, FieldBinding, Location, TagError};
