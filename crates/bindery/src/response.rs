//! Encoded responses.

use std::borrow::Cow;

use bindery_core::{Codec, GenericError, encode};
use bindery_types::{Describe, TypeDescriptor, mime};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Error;

/// A fully encoded HTTP response, ready for the transport to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// An empty response with `status`.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// All headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header with this name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `content-type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_value("content-type")
    }

    /// Body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Split into status, headers and body.
    #[must_use]
    pub fn into_parts(self) -> (u16, Vec<(String, String)>, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    /// Encode a handler's value. A unit value has no body; a value that
    /// does not encode becomes a 500 error.
    pub(crate) fn encode<T: Serialize>(
        status: u16,
        value: &T,
        descriptor: &TypeDescriptor,
        content_type: &str,
    ) -> Self {
        if *descriptor == TypeDescriptor::Unit {
            return Self::new(status);
        }
        match encode(value, descriptor, content_type) {
            Ok(body) => Self::new(status)
                .header("content-type", content_type)
                .body(body),
            Err(err) => {
                warn!(error = %err, content_type, "response encoding failed");
                Self::error(500, err.to_string(), content_type)
            }
        }
    }

    /// The generic error wire shape `{id, message, status}`.
    ///
    /// XML routes get an XML error body; every other content type gets JSON.
    #[must_use]
    pub fn error(status: u16, message: impl Into<String>, content_type: &str) -> Self {
        let error = GenericError::new(status, message);
        let content_type = match Codec::from_content_type(content_type) {
            Codec::Xml => mime::APPLICATION_XML,
            _ => mime::APPLICATION_JSON,
        };
        match encode(&error, &GenericError::describe(), content_type) {
            Ok(body) => Self::new(status)
                .header("content-type", content_type)
                .body(body),
            Err(err) => {
                warn!(error = %err, "error body encoding failed");
                Self::new(status)
            }
        }
    }

    /// The error response for a failed handler.
    pub(crate) fn from_error(err: &Error, content_type: &str) -> Self {
        let status = err.status();
        warn!(status, error = %err, "handler failed");
        Self::error(status, err.to_string(), content_type)
    }
}
