//! Request shapes.

use bindery_openapi::Schema;
use bindery_types::TypeDescriptor;

use crate::binder::Binder;
use crate::error::BindError;

/// One field of a request shape, as declared.
#[derive(Debug, Clone)]
pub enum ShapeField {
    /// A field with a `location=key` tag.
    Tagged {
        /// Rust identifier.
        ident: &'static str,
        /// The raw tag text; parsed when the route is registered.
        tag: &'static str,
        /// Describes the field's type.
        describe: fn() -> TypeDescriptor,
        /// The field type's schema.
        schema: fn() -> Schema,
    },
    /// An untagged field whose own fields are bound in place.
    Nested {
        /// Rust identifier.
        ident: &'static str,
        /// The nested shape's fields.
        fields: Vec<ShapeField>,
    },
}

impl ShapeField {
    /// A tagged field.
    #[must_use]
    pub fn tagged(
        ident: &'static str,
        tag: &'static str,
        describe: fn() -> TypeDescriptor,
        schema: fn() -> Schema,
    ) -> Self {
        Self::Tagged {
            ident,
            tag,
            describe,
            schema,
        }
    }

    /// A nested shape.
    #[must_use]
    pub fn nested(ident: &'static str, fields: Vec<ShapeField>) -> Self {
        Self::Nested { ident, fields }
    }

    /// The field's Rust identifier.
    #[must_use]
    pub fn ident(&self) -> &'static str {
        match self {
            Self::Tagged { ident, .. } | Self::Nested { ident, .. } => ident,
        }
    }
}

/// A type whose fields say where in a request their values come from.
///
/// Usually derived with `#[derive(RequestShape)]`. [`fields`](Self::fields)
/// is read once at registration to compile a
/// [`BindPlan`](crate::BindPlan); [`bind`](Self::bind) then pulls values
/// from a [`Binder`] in exactly the same order, depth first.
pub trait RequestShape: Sized {
    /// The declared fields in order.
    fn fields() -> Vec<ShapeField>;

    /// Build a value, pulling one planned field from `binder` per leaf.
    fn bind(binder: &mut Binder<'_>) -> Result<Self, BindError>;
}

/// The empty shape, for handlers that read nothing from the request.
impl RequestShape for () {
    fn fields() -> Vec<ShapeField> {
        Vec::new()
    }

    fn bind(_binder: &mut Binder<'_>) -> Result<Self, BindError> {
        Ok(())
    }
}
