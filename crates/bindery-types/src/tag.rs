//! Field annotation parsing.
//!
//! Every leaf field of a request shape carries a short annotation naming
//! where its value comes from:
//!
//! ```text
//! location=key[;modifier[=value]]*
//! ```
//!
//! `location` is one of `path`, `query`, `header`, `cookie` or `req`; the last
//! one only accepts the key `body`. Annotations are parsed once, at
//! registration, into a [`FieldBinding`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

const AUTH_MODIFIER: &str = "isauth";
const SCHEME_MODIFIER: &str = "scheme";
const NAME_MODIFIER: &str = "name";
const DEFAULT_AUTH_SCHEME: &str = "bearer";
const DEFAULT_AUTH_NAME: &str = "Authorization";

/// Where in a request a field's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Named path segment.
    Path,
    /// Query string parameter.
    Query,
    /// Request header.
    Header,
    /// Cookie from the `Cookie` header.
    Cookie,
    /// The whole request body.
    Body,
}

impl Location {
    /// Annotation token for this location.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "req",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "req" => Some(Self::Body),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The location token is not one of the recognized five.
    #[error("unknown parameter location `{location}` in tag `{tag}`")]
    UnknownLocation {
        /// The offending token.
        location: String,
        /// The whole annotation.
        tag: String,
    },
    /// The annotation does not follow `location=key`.
    #[error("invalid tag `{tag}`: {reason}")]
    Malformed {
        /// The whole annotation.
        tag: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Security scheme requested by an `isauth` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthScheme {
    /// Scheme name, `Authorization` unless overridden with `name=`.
    pub name: String,
    /// HTTP auth scheme, `bearer` unless overridden with `scheme=`.
    pub scheme: String,
}

/// A parsed field annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Dotted path of the field inside the request shape, for error messages.
    pub field: String,
    /// Where the value lives.
    pub location: Location,
    /// Name of the value at that location.
    pub key: String,
    /// False when the field's type may be absent.
    pub required: bool,
    /// Modifiers; flags map to an empty string.
    pub modifiers: BTreeMap<String, String>,
}

impl FieldBinding {
    /// Parse an annotation for `field`.
    pub fn parse(field: impl Into<String>, tag: &str, required: bool) -> Result<Self, TagError> {
        let mut segments = tag.split(';').map(str::trim);
        let head = segments.next().unwrap_or_default();
        let Some((token, key)) = head.split_once('=') else {
            return Err(TagError::Malformed {
                tag: tag.to_string(),
                reason: "expected `location=key`",
            });
        };

        let token = token.trim();
        let key = key.trim();
        let location = Location::from_token(token).ok_or_else(|| TagError::UnknownLocation {
            location: token.to_string(),
            tag: tag.to_string(),
        })?;

        if key.is_empty() {
            return Err(TagError::Malformed {
                tag: tag.to_string(),
                reason: "missing key",
            });
        }
        if location == Location::Body && key != "body" {
            return Err(TagError::Malformed {
                tag: tag.to_string(),
                reason: "the request location only accepts the key `body`",
            });
        }

        let modifiers = segments
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();

        Ok(Self {
            field: field.into(),
            location,
            key: key.to_string(),
            required,
            modifiers,
        })
    }

    /// True if the modifier is present, with or without a value.
    #[must_use]
    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    /// Value of a modifier, if present.
    #[must_use]
    pub fn modifier(&self, name: &str) -> Option<&str> {
        self.modifiers.get(name).map(String::as_str)
    }

    /// The security scheme this binding asks for, if it is an `isauth` header.
    #[must_use]
    pub fn auth(&self) -> Option<AuthScheme> {
        if self.location != Location::Header || !self.has_modifier(AUTH_MODIFIER) {
            return None;
        }
        let pick = |name: &str, default: &str| {
            self.modifier(name)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Some(AuthScheme {
            name: pick(NAME_MODIFIER, DEFAULT_AUTH_NAME),
            scheme: pick(SCHEME_MODIFIER, DEFAULT_AUTH_SCHEME),
        })
    }
}
