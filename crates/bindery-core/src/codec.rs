//! Content negotiation and body codecs.
//!
//! The codec set is fixed: JSON, XML, url-encoded forms and multipart forms.
//! A request's `Content-Type` picks the decoder and the route's response
//! content type picks the encoder; anything unrecognized is JSON.
//!
//! Field names follow the codec. JSON uses serde names as-is. XML element
//! names and form field names come from the type descriptor and are mapped
//! onto serde names before serde sees the data, so one `Deserialize` impl
//! serves every codec. Form and multipart values go through an intermediate
//! JSON object: scalars are coerced, file parts become [`UploadFile`]s and
//! any other field (a nested struct, a map) is read as a JSON blob.

use std::borrow::Cow;
use std::collections::HashMap;

use bindery_openapi::synth;
use bindery_types::{FieldDescriptor, NamingConvention, TypeDescriptor, Wrapper, mime};
use quick_xml::events::{BytesEnd, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::coerce::coerce;
use crate::error::CodecError;
use crate::multipart::{MultipartConfig, MultipartParser, Part, parse_boundary};
use crate::upload::UploadFile;

/// One of the supported body encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `multipart/form-data`
    Multipart,
}

impl Codec {
    /// Pick the codec for a content type. Unknown or empty means JSON.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = mime::essence(content_type);
        if essence.eq_ignore_ascii_case(mime::APPLICATION_XML) {
            Self::Xml
        } else if essence.eq_ignore_ascii_case(mime::APPLICATION_FORM) {
            Self::Form
        } else if essence.eq_ignore_ascii_case(mime::MULTIPART_FORM) {
            Self::Multipart
        } else {
            Self::Json
        }
    }

    /// Short name used in errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Form => "form",
            Self::Multipart => "multipart",
        }
    }

    /// Canonical content type.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => mime::APPLICATION_JSON,
            Self::Xml => mime::APPLICATION_XML,
            Self::Form => mime::APPLICATION_FORM,
            Self::Multipart => mime::MULTIPART_FORM,
        }
    }

    /// Which field names this codec uses.
    #[must_use]
    pub fn convention(self) -> NamingConvention {
        match self {
            Self::Json => NamingConvention::Json,
            Self::Xml => NamingConvention::Xml,
            Self::Form | Self::Multipart => NamingConvention::Form,
        }
    }
}

/// Decode a request body into `T`, described by `descriptor`.
pub fn decode<T: DeserializeOwned>(
    body: &[u8],
    content_type: &str,
    descriptor: &TypeDescriptor,
    multipart: &MultipartConfig,
) -> Result<T, CodecError> {
    let codec = Codec::from_content_type(content_type);
    match codec {
        Codec::Json => {
            serde_json::from_slice(body).map_err(|err| CodecError::decode(codec.name(), err))
        }
        Codec::Xml => decode_xml(body, descriptor),
        Codec::Form => {
            let pairs: Vec<(String, String)> = form_urlencoded::parse(body).into_owned().collect();
            let value = form_object(codec, descriptor, |name| {
                pairs
                    .iter()
                    .filter(|(key, _)| key == name)
                    .map(|(_, value)| FormValue::Text(Cow::Borrowed(value.as_str())))
                    .collect()
            })?;
            serde_json::from_value(value).map_err(|err| CodecError::decode(codec.name(), err))
        }
        Codec::Multipart => {
            let boundary = parse_boundary(content_type)?;
            let parts = MultipartParser::new(&boundary, *multipart).parse(body)?;
            let value = form_object(codec, descriptor, |name| {
                parts
                    .iter()
                    .filter(|part| part.name == name)
                    .map(FormValue::from_part)
                    .collect()
            })?;
            serde_json::from_value(value).map_err(|err| CodecError::decode(codec.name(), err))
        }
    }
}

/// Encode a response value under `content_type`.
pub fn encode<T: Serialize>(
    value: &T,
    descriptor: &TypeDescriptor,
    content_type: &str,
) -> Result<Vec<u8>, CodecError> {
    let codec = Codec::from_content_type(content_type);
    match codec {
        Codec::Json => serde_json::to_vec(value).map_err(|err| CodecError::encode(codec.name(), err)),
        Codec::Xml => encode_xml(value, descriptor),
        Codec::Form => encode_form(value, descriptor),
        Codec::Multipart => Err(CodecError::encode(
            codec.name(),
            "multipart responses are not supported",
        )),
    }
}

// XML

fn decode_xml<T: DeserializeOwned>(body: &[u8], descriptor: &TypeDescriptor) -> Result<T, CodecError> {
    let fail = |err: &dyn std::fmt::Display| CodecError::decode(Codec::Xml.name(), err);
    let text = std::str::from_utf8(body).map_err(|err| fail(&err))?;

    let renames: HashMap<&str, &str> = descriptor
        .as_struct()
        .map(|shape| {
            shape
                .fields
                .iter()
                .filter(|field| field.xml_name != field.json_name)
                .map(|field| (field.xml_name, field.json_name))
                .collect()
        })
        .unwrap_or_default();

    let text = if renames.is_empty() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(rename_children(text, &renames)?)
    };
    quick_xml::de::from_str(&text).map_err(|err| fail(&err))
}

/// Rename the root element's direct children according to `renames`.
fn rename_children(xml: &str, renames: &HashMap<&str, &str>) -> Result<String, CodecError> {
    let fail = |err: &dyn std::fmt::Display| CodecError::decode(Codec::Xml.name(), err);
    let lookup = |name: &[u8]| {
        std::str::from_utf8(name)
            .ok()
            .and_then(|name| renames.get(name))
            .copied()
    };

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;

    loop {
        let event = match reader.read_event().map_err(|err| fail(&err))? {
            Event::Start(mut start) => {
                depth += 1;
                if depth == 2 {
                    if let Some(name) = lookup(start.name().as_ref()) {
                        start.set_name(name.as_bytes());
                    }
                }
                Event::Start(start)
            }
            Event::Empty(mut start) => {
                if depth == 1 {
                    if let Some(name) = lookup(start.name().as_ref()) {
                        start.set_name(name.as_bytes());
                    }
                }
                Event::Empty(start)
            }
            Event::End(end) => {
                let renamed = if depth == 2 {
                    lookup(end.name().as_ref())
                } else {
                    None
                };
                depth = depth.saturating_sub(1);
                match renamed {
                    Some(name) => Event::End(BytesEnd::new(name)),
                    None => Event::End(end),
                }
            }
            Event::Eof => break,
            other => other,
        };
        writer.write_event(event).map_err(|err| fail(&err))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|err| fail(&err))
}

fn encode_xml<T: Serialize>(value: &T, descriptor: &TypeDescriptor) -> Result<Vec<u8>, CodecError> {
    let fail = |err: &dyn std::fmt::Display| CodecError::encode(Codec::Xml.name(), err);
    let mut value = serde_json::to_value(value).map_err(|err| fail(&err))?;

    if let (Some(shape), Value::Object(object)) = (descriptor.as_struct(), &mut value) {
        *object = std::mem::take(object)
            .into_iter()
            .map(|(key, value)| {
                let name = shape
                    .fields
                    .iter()
                    .find(|field| field.json_name == key)
                    .map_or(key, |field| field.xml_name.to_string());
                (name, value)
            })
            .collect();
    }

    let root = synth::schema_name(descriptor);
    quick_xml::se::to_string_with_root(root, &value)
        .map(String::into_bytes)
        .map_err(|err| fail(&err))
}

// Forms

/// One submitted value of a form field.
enum FormValue<'a> {
    Text(Cow<'a, str>),
    File(&'a Part),
}

impl<'a> FormValue<'a> {
    fn from_part(part: &'a Part) -> Self {
        if part.is_file() {
            Self::File(part)
        } else {
            Self::Text(String::from_utf8_lossy(&part.data))
        }
    }
}

/// Build the serde view of a form: an object keyed by serde names.
fn form_object<'a>(
    codec: Codec,
    descriptor: &TypeDescriptor,
    values: impl Fn(&str) -> Vec<FormValue<'a>>,
) -> Result<Value, CodecError> {
    let Some(shape) = descriptor.as_struct() else {
        return Err(CodecError::decode(
            codec.name(),
            format!("form bodies bind to structs, not {}", descriptor.kind_label()),
        ));
    };

    let mut object = Map::new();
    for field in &shape.fields {
        let found = values(field.form_name);
        if found.is_empty() {
            continue;
        }
        let value = form_field(codec, field, &field.descriptor(), found)?;
        object.insert(field.json_name.to_string(), value);
    }
    Ok(Value::Object(object))
}

fn form_field(
    codec: Codec,
    field: &FieldDescriptor,
    descriptor: &TypeDescriptor,
    found: Vec<FormValue<'_>>,
) -> Result<Value, CodecError> {
    match descriptor {
        TypeDescriptor::Wrapped(Wrapper::Optional | Wrapper::Pointer, inner) => {
            form_field(codec, field, inner, found)
        }
        TypeDescriptor::Wrapped(Wrapper::Slice | Wrapper::Array, element) => found
            .into_iter()
            .map(|value| form_value(codec, field, element, value))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => match found.into_iter().next() {
            Some(value) => form_value(codec, field, descriptor, value),
            None => Ok(Value::Null),
        },
    }
}

fn form_value(
    codec: Codec,
    field: &FieldDescriptor,
    descriptor: &TypeDescriptor,
    value: FormValue<'_>,
) -> Result<Value, CodecError> {
    let fail = |message: String| {
        CodecError::decode(codec.name(), format!("field `{}`: {message}", field.form_name))
    };

    match (descriptor, value) {
        (TypeDescriptor::File, FormValue::File(part)) => UploadFile::from_part(part)
            .map(|file| file.to_value())
            .ok_or_else(|| fail("expected a file part".to_string())),
        (TypeDescriptor::File, FormValue::Text(_)) => Err(fail("expected a file part".to_string())),
        (_, FormValue::File(_)) => Err(fail("unexpected file part".to_string())),
        (TypeDescriptor::Scalar(kind), FormValue::Text(text)) => {
            coerce(field.form_name, &text, *kind).map_err(|err| fail(err.to_string()))
        }
        (TypeDescriptor::Enum(_), FormValue::Text(text)) => Ok(Value::String(text.into_owned())),
        // Nested structs, maps and dynamic values travel as JSON text.
        (_, FormValue::Text(text)) => {
            serde_json::from_str(&text).map_err(|err| fail(format!("invalid JSON: {err}")))
        }
    }
}

fn encode_form<T: Serialize>(value: &T, descriptor: &TypeDescriptor) -> Result<Vec<u8>, CodecError> {
    let fail = |message: String| CodecError::encode(Codec::Form.name(), message);
    let Value::Object(object) = serde_json::to_value(value).map_err(|err| fail(err.to_string()))?
    else {
        return Err(fail("form responses must be objects".to_string()));
    };

    let text = |value: &Value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &object {
        let name = descriptor
            .as_struct()
            .and_then(|shape| shape.fields.iter().find(|field| field.json_name == key))
            .map_or(key.as_str(), |field| field.form_name);
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(name, &text(item));
                }
            }
            other => {
                serializer.append_pair(name, &text(other));
            }
        }
    }
    Ok(serializer.finish().into_bytes())
}
