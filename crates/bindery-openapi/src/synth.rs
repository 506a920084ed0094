//! Schema naming and required-list synthesis.
//!
//! A type's component name comes from peeling wrappers (`Option`, `Vec`,
//! maps, pointers, ...) until a named type is reached. The peel is bounded:
//! after [`MAX_DIVE_DEPTH`] layers the name falls back to [`DEFAULT_NAME`].
//! Dynamic values are named [`UNKNOWN_INTERFACE`].

use bindery_types::{NamingConvention, TypeDescriptor, Wrapper};

use crate::schema::{ObjectSchema, Schema};

/// Name used when the wrapper budget runs out.
pub const DEFAULT_NAME: &str = "default";

/// Name used for dynamically typed values.
pub const UNKNOWN_INTERFACE: &str = "unknown-interface";

/// Number of wrapper layers peeled before giving up.
pub const MAX_DIVE_DEPTH: usize = 4;

/// Component name for a type.
#[must_use]
pub fn schema_name(descriptor: &TypeDescriptor) -> &'static str {
    dive(descriptor, MAX_DIVE_DEPTH)
}

fn dive(descriptor: &TypeDescriptor, budget: usize) -> &'static str {
    match descriptor {
        TypeDescriptor::Wrapped(_, inner) => {
            if budget == 0 {
                DEFAULT_NAME
            } else {
                dive(inner, budget - 1)
            }
        }
        TypeDescriptor::Interface => UNKNOWN_INTERFACE,
        other => other.name(),
    }
}

/// Required property names of a struct: every direct field that is not an
/// `Option`, named under `convention`. Non-struct types have none.
#[must_use]
pub fn required_fields(descriptor: &TypeDescriptor, convention: NamingConvention) -> Vec<String> {
    descriptor
        .as_struct()
        .map(|s| {
            s.fields
                .iter()
                .filter(|field| !field.descriptor().is_optional())
                .map(|field| field.name_for(convention).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Fill in the required list of a struct's schema.
#[must_use]
pub fn with_required(
    descriptor: &TypeDescriptor,
    schema: Schema,
    convention: NamingConvention,
) -> Schema {
    let required = required_fields(descriptor, convention);
    if required.is_empty() {
        schema
    } else {
        schema.with_required(required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Array,
    Map,
}

/// A schema split at its named element.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSchema {
    /// Component name of the element.
    pub name: &'static str,
    /// Schema of the element, stored under `name`.
    pub element: Schema,
    layers: Vec<Layer>,
}

impl NamedSchema {
    /// Schema to use at the point of use: the element reference wrapped in
    /// the same array and map layers the full type has.
    #[must_use]
    pub fn usage(&self) -> Schema {
        self.layers
            .iter()
            .rev()
            .fold(Schema::reference(self.name), |inner, layer| match layer {
                Layer::Array => Schema::array(inner),
                Layer::Map => Schema::map(inner),
            })
    }
}

/// Split a type's full schema into its named element and the wrapper layers
/// around it, following the same bounded peel as [`schema_name`].
#[must_use]
pub fn split(descriptor: &TypeDescriptor, schema: Schema) -> NamedSchema {
    let mut layers = Vec::new();
    let (name, element) = peel(descriptor, schema, MAX_DIVE_DEPTH, &mut layers);
    NamedSchema {
        name,
        element,
        layers,
    }
}

fn peel(
    descriptor: &TypeDescriptor,
    schema: Schema,
    budget: usize,
    layers: &mut Vec<Layer>,
) -> (&'static str, Schema) {
    match descriptor {
        TypeDescriptor::Wrapped(wrapper, inner) => {
            if budget == 0 {
                return (DEFAULT_NAME, schema);
            }
            match (wrapper, schema) {
                (Wrapper::Slice | Wrapper::Array, Schema::Array(array)) => {
                    layers.push(Layer::Array);
                    peel(inner, *array.items, budget - 1, layers)
                }
                (
                    Wrapper::Map,
                    Schema::Object(ObjectSchema {
                        additional_properties: Some(values),
                        ..
                    }),
                ) => {
                    layers.push(Layer::Map);
                    peel(inner, *values, budget - 1, layers)
                }
                (_, schema) => peel(inner, schema, budget - 1, layers),
            }
        }
        TypeDescriptor::Interface => (UNKNOWN_INTERFACE, schema),
        other => (other.name(), schema),
    }
}
