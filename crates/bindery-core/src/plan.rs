//! Bind plan compilation.
//!
//! A request shape's declared fields are compiled once, at registration, into
//! a flat list of [`PlannedField`]s: tags parsed, nested shapes flattened
//! depth first, and every field's type checked against the binding strategy
//! its location needs. Requests never see a raw tag or an unsupported kind.

use bindery_openapi::Schema;
use bindery_types::{FieldBinding, Location, ScalarKind, TagError, TypeDescriptor, Wrapper};
use tracing::debug;

use crate::error::RegistrationError;
use crate::shape::{RequestShape, ShapeField};

/// How a planned field's value is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// One text value coerced to a scalar.
    Scalar(ScalarKind),
    /// One text value matched against enum variant names.
    Text,
    /// Every value of a repeated query key, each coerced.
    List(ScalarKind),
    /// The whole body, decoded into this struct.
    Body(TypeDescriptor),
}

/// A field ready to bind.
#[derive(Debug, Clone)]
pub struct PlannedField {
    /// Parsed tag.
    pub binding: FieldBinding,
    /// Binding strategy.
    pub target: Target,
    /// Describes the field's type.
    pub describe: fn() -> TypeDescriptor,
    /// The field type's schema.
    pub schema: fn() -> Schema,
}

/// Compiled fields of one request shape.
#[derive(Debug, Clone, Default)]
pub struct BindPlan {
    fields: Vec<PlannedField>,
    body: Option<usize>,
}

impl BindPlan {
    /// Compile the plan for a shape type.
    pub fn for_shape<S: RequestShape>() -> Result<Self, RegistrationError> {
        Self::compile(S::fields())
    }

    /// Compile declared fields.
    pub fn compile(fields: Vec<ShapeField>) -> Result<Self, RegistrationError> {
        let mut plan = Self::default();
        plan.flatten(fields, "")?;
        Ok(plan)
    }

    fn flatten(&mut self, fields: Vec<ShapeField>, prefix: &str) -> Result<(), RegistrationError> {
        for field in fields {
            let path = if prefix.is_empty() {
                field.ident().to_string()
            } else {
                format!("{prefix}.{}", field.ident())
            };
            match field {
                ShapeField::Nested { fields, .. } => self.flatten(fields, &path)?,
                ShapeField::Tagged {
                    tag,
                    describe,
                    schema,
                    ..
                } => {
                    let descriptor = describe();
                    let mut binding = FieldBinding::parse(&path, tag, !descriptor.is_optional())
                        .map_err(|err| RegistrationError::from_tag(&path, err))?;
                    let target = classify(&binding, &descriptor)?;

                    if matches!(target, Target::Body(_)) {
                        if self.body.is_some() {
                            return Err(RegistrationError::InvalidTag {
                                field: path,
                                source: TagError::Malformed {
                                    tag: tag.to_string(),
                                    reason: "only one field may bind the request body",
                                },
                            });
                        }
                        self.body = Some(self.fields.len());
                    }
                    if matches!(target, Target::List(_)) {
                        // An absent repeated key binds an empty list.
                        binding.required = false;
                    }

                    debug!(
                        field = %binding.field,
                        location = %binding.location,
                        key = %binding.key,
                        "planned field"
                    );
                    self.fields.push(PlannedField {
                        binding,
                        target,
                        describe,
                        schema,
                    });
                }
            }
        }
        Ok(())
    }

    /// Every planned field in binding order.
    #[must_use]
    pub fn fields(&self) -> &[PlannedField] {
        &self.fields
    }

    /// The field bound to the request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&PlannedField> {
        self.body.map(|index| &self.fields[index])
    }

    /// Path, query, header and cookie fields in binding order.
    pub fn parameters(&self) -> impl Iterator<Item = &PlannedField> {
        self.fields
            .iter()
            .filter(|field| field.binding.location != Location::Body)
    }

    /// Number of planned fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for shapes with no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Pick the binding strategy for a field, or reject its kind.
fn classify(binding: &FieldBinding, descriptor: &TypeDescriptor) -> Result<Target, RegistrationError> {
    let unsupported = || RegistrationError::UnsupportedFieldKind {
        field: binding.field.clone(),
        location: binding.location,
        kind: descriptor.kind_label(),
    };

    if binding.location == Location::Body {
        return match descriptor {
            TypeDescriptor::Struct(_) => Ok(Target::Body(descriptor.clone())),
            _ => Err(unsupported()),
        };
    }

    // A value may sit behind one `Option` and one smart pointer, in that order.
    let mut inner = descriptor.unwrap_optional();
    if let TypeDescriptor::Wrapped(Wrapper::Pointer, pointee) = inner {
        inner = pointee;
        if !matches!(inner, TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_)) {
            return Err(unsupported());
        }
    }

    match inner {
        TypeDescriptor::Scalar(kind) => Ok(Target::Scalar(*kind)),
        TypeDescriptor::Enum(_) => Ok(Target::Text),
        TypeDescriptor::Wrapped(Wrapper::Slice, element) if binding.location == Location::Query => {
            match **element {
                TypeDescriptor::Scalar(kind) => Ok(Target::List(kind)),
                _ => Err(unsupported()),
            }
        }
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bindery_openapi::JsonSchema;
    use bindery_types::{Describe, FieldDescriptor, StructDescriptor};

    use super::*;

    fn tagged<T: Describe + JsonSchema>(ident: &'static str, tag: &'static str) -> ShapeField {
        ShapeField::tagged(ident, tag, T::describe, T::schema)
    }

    fn body_descriptor() -> TypeDescriptor {
        TypeDescriptor::Struct(StructDescriptor {
            name: "Body",
            fields: vec![FieldDescriptor::new("id", f64::describe)],
        })
    }

    fn body_schema() -> Schema {
        Schema::object(std::collections::BTreeMap::new(), Vec::new())
    }

    fn body_field() -> ShapeField {
        ShapeField::tagged("body", "req=body", body_descriptor, body_schema)
    }

    #[test]
    fn test_flattens_nested_shapes_in_order() {
        let plan = BindPlan::compile(vec![
            ShapeField::nested(
                "params",
                vec![
                    tagged::<u64>("id", "path=id"),
                    tagged::<Option<String>>("filter", "query=filter"),
                ],
            ),
            body_field(),
            tagged::<String>("token", "header=Authorization;isauth"),
        ])
        .unwrap();

        let fields: Vec<_> = plan.fields().iter().map(|f| f.binding.field.as_str()).collect();
        assert_eq!(fields, vec!["params.id", "params.filter", "body", "token"]);
        assert!(plan.fields()[0].binding.required);
        assert!(!plan.fields()[1].binding.required);
        assert_eq!(plan.body().unwrap().binding.field, "body");
        assert_eq!(plan.parameters().count(), 3);
        assert_eq!(plan.fields()[0].target, Target::Scalar(ScalarKind::U64));
    }

    #[test]
    fn test_unknown_location() {
        let err = BindPlan::compile(vec![tagged::<u64>("id", "unknown=id")]).unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownParameterLocation { .. }));
    }

    #[test]
    fn test_req_requires_body_key() {
        let err = BindPlan::compile(vec![ShapeField::tagged(
            "body",
            "req=payload",
            body_descriptor,
            body_schema,
        )])
        .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidTag { .. }));
    }

    #[test]
    fn test_second_body_is_rejected() {
        let err = BindPlan::compile(vec![body_field(), body_field()]).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidTag { .. }));
    }

    #[test]
    fn test_unsupported_kinds() {
        let cases = [
            tagged::<Option<Vec<u8>>>("v", "path=v"),
            tagged::<HashMap<String, String>>("m", "query=m"),
            tagged::<serde_json::Value>("i", "header=i"),
            tagged::<Box<Vec<u8>>>("p", "query=p"),
            tagged::<Box<Box<u8>>>("pp", "query=pp"),
            tagged::<[u8; 2]>("a", "query=a"),
            tagged::<Vec<u8>>("h", "header=h"),
            tagged::<Vec<Vec<u8>>>("nested", "query=nested"),
            tagged::<u64>("b", "req=body"),
        ];
        for field in cases {
            let ident = field.ident();
            let err = BindPlan::compile(vec![field]).unwrap_err();
            assert!(
                matches!(err, RegistrationError::UnsupportedFieldKind { .. }),
                "{ident}: {err}"
            );
        }
    }

    #[test]
    fn test_struct_param_is_unsupported() {
        let err = BindPlan::compile(vec![ShapeField::tagged(
            "meta",
            "query=meta",
            || TypeDescriptor::wrap(Wrapper::Optional, body_descriptor()),
            body_schema,
        )])
        .unwrap_err();
        let RegistrationError::UnsupportedFieldKind { kind, .. } = err else {
            panic!("expected unsupported kind");
        };
        assert_eq!(kind, "optional struct");
    }

    #[test]
    fn test_supported_wrappers() {
        let plan = BindPlan::compile(vec![
            tagged::<Option<Box<i32>>>("a", "query=a"),
            tagged::<Vec<u32>>("tags", "query=tag"),
            tagged::<Option<bool>>("flag", "cookie=flag"),
        ])
        .unwrap();
        assert_eq!(plan.fields()[0].target, Target::Scalar(ScalarKind::I32));
        assert_eq!(plan.fields()[1].target, Target::List(ScalarKind::U32));
        assert!(!plan.fields()[1].binding.required);
        assert_eq!(plan.fields()[2].target, Target::Scalar(ScalarKind::Bool));
    }

    #[test]
    fn test_unit_shape_is_empty() {
        assert!(BindPlan::for_shape::<()>().unwrap().is_empty());
    }
}
