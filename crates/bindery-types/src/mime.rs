//! Content types understood by the codecs, and the field naming convention
//! each one implies.

/// `application/json`
pub const APPLICATION_JSON: &str = "application/json";
/// `application/xml`
pub const APPLICATION_XML: &str = "application/xml";
/// `application/x-www-form-urlencoded`
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MULTIPART_FORM: &str = "multipart/form-data";
/// `text/plain`
pub const TEXT_PLAIN: &str = "text/plain";
/// `application/octet-stream`
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Strip parameters (`; charset=...`, `; boundary=...`) from a content type.
#[must_use]
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Case-insensitive comparison of two content types, ignoring parameters.
#[must_use]
pub fn same_essence(a: &str, b: &str) -> bool {
    essence(a).eq_ignore_ascii_case(essence(b))
}

/// Which of a field's names is used under a given content type.
///
/// A field may be called `first_name` in JSON, `FirstName` in XML and
/// `first-name` in a form; the required list of a schema and the keys used
/// when decoding follow the convention of the content type in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingConvention {
    /// serde names.
    Json,
    /// XML element names.
    Xml,
    /// Form and multipart field names.
    Form,
}

impl NamingConvention {
    /// Convention for a content type. Anything outside xml, url-encoded and
    /// multipart falls back to JSON.
    #[must_use]
    pub fn for_content_type(content_type: &str) -> Self {
        let essence = essence(content_type);
        if essence.eq_ignore_ascii_case(APPLICATION_XML) {
            Self::Xml
        } else if essence.eq_ignore_ascii_case(APPLICATION_FORM)
            || essence.eq_ignore_ascii_case(MULTIPART_FORM)
        {
            Self::Form
        } else {
            Self::Json
        }
    }
}
