//! Uploaded files.

use std::fmt;
use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bindery_openapi::{JsonSchema, Schema};
use bindery_types::{Describe, TypeDescriptor, mime};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::multipart::Part;

/// A file received in a request body.
///
/// Multipart bodies deliver the raw part; JSON bodies carry the content as a
/// base64 string. Either way the schema is `{type: string, format: byte}`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, empty when the client did not send one.
    pub file_name: String,
    /// Content type reported by the client.
    pub content_type: String,
    /// File bytes.
    pub content: Vec<u8>,
}

impl UploadFile {
    /// Create a file.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Build from a multipart part; `None` unless the part is a file.
    #[must_use]
    pub fn from_part(part: &Part) -> Option<Self> {
        let file_name = part.filename.clone()?;
        Some(Self {
            file_name,
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| mime::OCTET_STREAM.to_string()),
            content: part.data.clone(),
        })
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Extension of the file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Write the content to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.content)
    }

    /// The intermediate value the form codecs hand to serde.
    pub(crate) fn to_value(&self) -> Value {
        json!({
            "file_name": self.file_name,
            "content_type": self.content_type,
            "content": STANDARD.encode(&self.content),
        })
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

impl Serialize for UploadFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.content))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Encoded(String),
    Full {
        #[serde(default)]
        file_name: String,
        #[serde(default)]
        content_type: String,
        content: String,
    },
}

impl<'de> Deserialize<'de> for UploadFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (file_name, content_type, encoded) = match Repr::deserialize(deserializer)? {
            Repr::Encoded(content) => (String::new(), mime::OCTET_STREAM.to_string(), content),
            Repr::Full {
                file_name,
                content_type,
                content,
            } => (file_name, content_type, content),
        };
        let content = STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom)?;
        Ok(Self {
            file_name,
            content_type,
            content,
        })
    }
}

impl Describe for UploadFile {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::File
    }
}

impl JsonSchema for UploadFile {
    fn schema() -> Schema {
        Schema::string_with_format("byte")
    }
}
