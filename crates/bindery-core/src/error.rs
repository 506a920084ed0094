//! Error types.
//!
//! Errors fall into two phases. [`RegistrationError`]s come out of compiling
//! a request shape when a route is declared and must stop the application
//! from serving. [`BindError`]s come out of binding one request and are
//! turned into the [`GenericError`] wire shape at the boundary.

use bindery_openapi::GENERIC_ERROR_SCHEMA;
use bindery_types::{
    Describe, FieldDescriptor, Location, Method, StructDescriptor, TagError, TypeDescriptor,
};
use serde::{Deserialize, Serialize};

use crate::multipart::MultipartError;

/// An error carrying an explicit HTTP status, raised by handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    status: u16,
    message: String,
}

impl HttpError {
    /// Create an error with any status.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericError {
    /// Fresh v4 UUID identifying this occurrence.
    pub id: String,
    /// Human readable message.
    pub message: String,
    /// HTTP status.
    pub status: u16,
}

impl GenericError {
    /// Build the wire error for a status and message with a new id.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            status,
        }
    }
}

impl Describe for GenericError {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Struct(StructDescriptor {
            name: GENERIC_ERROR_SCHEMA,
            fields: vec![
                FieldDescriptor::new("id", String::describe),
                FieldDescriptor::new("message", String::describe),
                FieldDescriptor::new("status", u16::describe),
            ],
        })
    }
}

/// A raw value that does not parse as the field's scalar type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert `{raw}` to {target} for field `{field}`")]
pub struct CoercionError {
    /// Dotted field path.
    pub field: String,
    /// The raw text.
    pub raw: String,
    /// Target type name.
    pub target: String,
}

/// Body decode or response encode failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The request body does not decode under the negotiated codec.
    #[error("cannot decode {codec} body: {message}")]
    Decode {
        /// Codec name.
        codec: &'static str,
        /// Underlying failure.
        message: String,
    },
    /// The response value does not encode under the declared codec.
    #[error("cannot encode {codec} response: {message}")]
    Encode {
        /// Codec name.
        codec: &'static str,
        /// Underlying failure.
        message: String,
    },
    /// Malformed or oversized multipart body.
    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl CodecError {
    pub(crate) fn decode(codec: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            codec,
            message: message.to_string(),
        }
    }

    pub(crate) fn encode(codec: &'static str, message: impl ToString) -> Self {
        Self::Encode {
            codec,
            message: message.to_string(),
        }
    }
}

/// Request-time binding failure. Binding stops at the first one.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A required path, query, header or cookie value is absent.
    #[error("missing required {location} value `{key}` for field `{field}`")]
    MissingRequiredField {
        /// Dotted field path.
        field: String,
        /// Where the value was looked up.
        location: Location,
        /// Key looked up.
        key: String,
    },
    /// A present value does not parse.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    /// The body does not decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A hand-written shape asked for fields its plan does not have.
    #[error("request shape does not match its bind plan at field {position}: {detail}")]
    ShapeMismatch {
        /// Zero-based position in the flattened plan.
        position: usize,
        /// What went wrong.
        detail: &'static str,
    },
}

/// Route declaration failure. Never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// A tag names a location outside path, query, header, cookie and req.
    #[error("unknown parameter location `{location}` on field `{field}` (tag `{tag}`)")]
    UnknownParameterLocation {
        /// Dotted field path.
        field: String,
        /// The offending token.
        location: String,
        /// The whole tag.
        tag: String,
    },
    /// A tag that does not follow the mini-language.
    #[error("invalid tag on field `{field}`: {source}")]
    InvalidTag {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        #[source]
        source: TagError,
    },
    /// A field whose type no binding strategy handles.
    #[error("field `{field}` has unsupported kind {kind} for {location} binding")]
    UnsupportedFieldKind {
        /// Dotted field path.
        field: String,
        /// Where the field binds from.
        location: Location,
        /// Kind label, e.g. "optional struct".
        kind: String,
    },
    /// A second registration for the same method and path.
    #[error("route {method} {path} is already registered")]
    DuplicateRoute {
        /// Method.
        method: Method,
        /// Route template.
        path: String,
    },
}

impl RegistrationError {
    pub(crate) fn from_tag(field: &str, err: TagError) -> Self {
        match err {
            TagError::UnknownLocation { location, tag } => Self::UnknownParameterLocation {
                field: field.to_string(),
                location,
                tag,
            },
            source @ TagError::Malformed { .. } => Self::InvalidTag {
                field: field.to_string(),
                source,
            },
        }
    }
}
