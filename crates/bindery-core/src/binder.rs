//! Field binding.
//!
//! A [`Binder`] walks a compiled [`BindPlan`] against one request. The shape's
//! `bind` asks for each field in declaration order; the binder hands out the
//! next planned field, looks its raw value up, coerces it and lets serde move
//! it into the field's type. The first failure ends binding.

use bindery_types::Location;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::codec;
use crate::coerce::coerce;
use crate::error::{BindError, CoercionError};
use crate::multipart::MultipartConfig;
use crate::plan::{BindPlan, PlannedField, Target};
use crate::request::Request;
use crate::shape::RequestShape;

/// Binds one request against one plan.
#[derive(Debug)]
pub struct Binder<'a> {
    plan: &'a BindPlan,
    request: &'a Request,
    multipart: &'a MultipartConfig,
    cursor: usize,
}

impl<'a> Binder<'a> {
    /// Start binding `request`.
    #[must_use]
    pub fn new(plan: &'a BindPlan, request: &'a Request, multipart: &'a MultipartConfig) -> Self {
        Self {
            plan,
            request,
            multipart,
            cursor: 0,
        }
    }

    /// Bind a whole shape. Every planned field must be consumed.
    pub fn bind<S: RequestShape>(mut self) -> Result<S, BindError> {
        let value = S::bind(&mut self)?;
        if self.cursor != self.plan.len() {
            return Err(BindError::ShapeMismatch {
                position: self.cursor,
                detail: "shape bound fewer fields than it declared",
            });
        }
        Ok(value)
    }

    fn next(&mut self) -> Result<&'a PlannedField, BindError> {
        let plan: &'a BindPlan = self.plan;
        let field = plan.fields().get(self.cursor).ok_or(BindError::ShapeMismatch {
            position: self.cursor,
            detail: "shape bound more fields than it declared",
        })?;
        self.cursor += 1;
        Ok(field)
    }

    /// Bind the next field from a path, query, header or cookie value.
    pub fn param<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        let position = self.cursor;
        let field = self.next()?;
        let binding = &field.binding;
        debug!(
            field = %binding.field,
            location = %binding.location,
            key = %binding.key,
            "binding field"
        );

        let (value, raw) = match &field.target {
            Target::Scalar(kind) => match self.lookup(field) {
                Some(raw) => (coerce(&binding.field, &raw, *kind)?, raw),
                None => (absent(field)?, String::new()),
            },
            Target::Text => match self.lookup(field) {
                Some(raw) => (Value::String(raw.clone()), raw),
                None => (absent(field)?, String::new()),
            },
            Target::List(kind) => {
                let raws = self.request.query_values(&binding.key);
                let values = raws
                    .iter()
                    .map(|raw| coerce(&binding.field, raw, *kind))
                    .collect::<Result<Vec<_>, _>>()?;
                (Value::Array(values), raws.join(","))
            }
            Target::Body(_) => {
                return Err(BindError::ShapeMismatch {
                    position,
                    detail: "body field bound as a parameter",
                });
            }
        };

        serde_json::from_value(value).map_err(|_| {
            BindError::Coercion(CoercionError {
                field: binding.field.clone(),
                raw,
                target: std::any::type_name::<T>().to_string(),
            })
        })
    }

    /// Bind the next field from the request body.
    pub fn body<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        let position = self.cursor;
        let field = self.next()?;
        let Target::Body(descriptor) = &field.target else {
            return Err(BindError::ShapeMismatch {
                position,
                detail: "parameter field bound as the body",
            });
        };
        let content_type = self.request.content_type().unwrap_or_default();
        debug!(field = %field.binding.field, content_type, "decoding body");
        Ok(codec::decode(
            self.request.body().as_bytes(),
            content_type,
            descriptor,
            self.multipart,
        )?)
    }

    fn lookup(&self, field: &PlannedField) -> Option<String> {
        let key = field.binding.key.as_str();
        match field.binding.location {
            Location::Path => self.request.path_param(key).map(str::to_string),
            Location::Query => self.request.query_value(key),
            Location::Header => self.request.headers().get(key).map(str::to_string),
            Location::Cookie => self.request.cookie(key).map(str::to_string),
            Location::Body => None,
        }
    }
}

/// Value for a field with nothing to bind: an error when required, else null.
fn absent(field: &PlannedField) -> Result<Value, BindError> {
    if field.binding.required {
        Err(BindError::MissingRequiredField {
            field: field.binding.field.clone(),
            location: field.binding.location,
            key: field.binding.key.clone(),
        })
    } else {
        Ok(Value::Null)
    }
}
