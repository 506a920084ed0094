//! `multipart/form-data` parsing.
//!
//! The whole body is parsed in one pass into [`Part`]s, enforcing a per-file
//! size limit, a total size limit and a part count limit. The codec layer
//! turns the parts into a structured value keyed by form field names.

use std::collections::HashMap;

use memchr::memmem;
use serde::Deserialize;

/// 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// 50 MiB.
pub const DEFAULT_MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Part count limit unless configured.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

const CRLF: &[u8] = b"\r\n";

/// Limits applied while parsing multipart bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultipartConfig {
    /// Per-file limit in bytes.
    pub max_file_size: usize,
    /// Limit on the sum of all part bodies in bytes.
    pub max_total_size: usize,
    /// Limit on the number of parts.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest accepted file part, in bytes.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Largest accepted body, in bytes.
    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Most parts accepted in one body.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// A malformed or oversized multipart body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The content type carries no `boundary` parameter.
    #[error("missing boundary in multipart Content-Type")]
    MissingBoundary,
    /// Empty or longer than 70 characters.
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    /// A file part is over `max_file_size`.
    #[error("file too large: {size} bytes exceeds limit of {max}")]
    FileTooLarge { size: usize, max: usize },
    /// The parts together are over `max_total_size`.
    #[error("total upload too large: {size} bytes exceeds limit of {max}")]
    TotalTooLarge { size: usize, max: usize },
    /// More than `max_fields` parts.
    #[error("too many fields: {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
    /// A part without `Content-Disposition`.
    #[error("missing Content-Disposition header in part")]
    MissingContentDisposition,
    /// `Content-Disposition` without a usable name or filename.
    #[error("invalid Content-Disposition: {detail}")]
    InvalidContentDisposition { detail: &'static str },
    /// Invalid part headers.
    #[error("invalid part headers: {detail}")]
    InvalidPartHeaders { detail: &'static str },
    /// The body ended before the closing delimiter.
    #[error("unexpected end of multipart data")]
    UnexpectedEof,
    /// Anything else structurally wrong.
    #[error("invalid multipart format: {detail}")]
    InvalidFormat { detail: &'static str },
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name from Content-Disposition.
    pub name: String,
    /// Filename from Content-Disposition, present for file parts.
    pub filename: Option<String>,
    /// Content-Type of the part, if given.
    pub content_type: Option<String>,
    /// Raw content.
    pub data: Vec<u8>,
    /// Every part header, lowercased names.
    pub headers: HashMap<String, String>,
}

impl Part {
    /// True for file uploads.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Content as UTF-8, if valid.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    let mut params = content_type.trim().split(';');
    let essence = params.next().unwrap_or_default().trim();
    if !essence.eq_ignore_ascii_case(bindery_types::mime::MULTIPART_FORM) {
        return Err(MultipartError::InvalidBoundary);
    }

    let boundary = params
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').trim_matches('\''))
        .ok_or(MultipartError::MissingBoundary)?;

    if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
        return Err(MultipartError::InvalidBoundary);
    }
    Ok(boundary.to_string())
}

/// Boundary-delimited multipart parser.
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: Vec<u8>,
    config: MultipartConfig,
}

impl MultipartParser {
    /// Parser for bodies delimited by `--{boundary}`.
    #[must_use]
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            config,
        }
    }

    /// Parse every part of `body`.
    pub fn parse(&self, body: &[u8]) -> Result<Vec<Part>, MultipartError> {
        let finder = memmem::Finder::new(&self.delimiter);
        let mut parts = Vec::new();
        let mut total_size = 0usize;

        // The preamble before the first delimiter is ignored.
        let mut pos = self.find_delimiter(&finder, body, 0)?;

        loop {
            let after = pos + self.delimiter.len();
            if body[after..].starts_with(b"--") {
                return Ok(parts);
            }
            if parts.len() >= self.config.max_fields {
                return Err(MultipartError::TooManyFields {
                    count: parts.len() + 1,
                    max: self.config.max_fields,
                });
            }
            if !body[after..].starts_with(CRLF) {
                return Err(MultipartError::InvalidFormat {
                    detail: "expected CRLF after boundary",
                });
            }

            let (headers, data_start) = parse_part_headers(body, after + CRLF.len())?;
            let disposition = headers
                .get("content-disposition")
                .ok_or(MultipartError::MissingContentDisposition)?;
            let (name, filename) = parse_content_disposition(disposition)?;

            let next = self.find_delimiter(&finder, body, data_start)?;
            // The CRLF before a delimiter belongs to the delimiter.
            let data_end = if next >= data_start + CRLF.len() && body[..next].ends_with(CRLF) {
                next - CRLF.len()
            } else {
                next
            };
            let data = &body[data_start..data_end];

            if filename.is_some() && data.len() > self.config.max_file_size {
                return Err(MultipartError::FileTooLarge {
                    size: data.len(),
                    max: self.config.max_file_size,
                });
            }
            total_size += data.len();
            if total_size > self.config.max_total_size {
                return Err(MultipartError::TotalTooLarge {
                    size: total_size,
                    max: self.config.max_total_size,
                });
            }

            parts.push(Part {
                name,
                filename,
                content_type: headers.get("content-type").cloned(),
                data: data.to_vec(),
                headers,
            });
            pos = next;
        }
    }

    /// Position of the next delimiter at or after `start` that sits at the
    /// start of the body or of a line and is followed by CRLF or `--`.
    fn find_delimiter(
        &self,
        finder: &memmem::Finder<'_>,
        body: &[u8],
        start: usize,
    ) -> Result<usize, MultipartError> {
        let mut from = start;
        while let Some(offset) = finder.find(&body[from..]) {
            let at = from + offset;
            let line_start = at == 0 || body[..at].ends_with(CRLF);
            let end = at + self.delimiter.len();
            if end + 2 > body.len() {
                return Err(MultipartError::UnexpectedEof);
            }
            let suffix = &body[end..end + 2];
            if line_start && (suffix == CRLF || suffix == b"--") {
                return Ok(at);
            }
            from = at + 1;
        }
        Err(MultipartError::UnexpectedEof)
    }
}

fn parse_part_headers(
    body: &[u8],
    start: usize,
) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;

    loop {
        let line_end = memmem::find(&body[pos..], CRLF)
            .map(|offset| pos + offset)
            .ok_or(MultipartError::UnexpectedEof)?;
        let line = &body[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + CRLF.len()));
        }

        let line = std::str::from_utf8(line).map_err(|_| MultipartError::InvalidPartHeaders {
            detail: "invalid UTF-8 in header",
        })?;
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        pos = line_end + CRLF.len();
    }
}

/// Parse `form-data; name="field"; filename="file.txt"`.
fn parse_content_disposition(value: &str) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw));
        } else if key.eq_ignore_ascii_case("filename") {
            let unquoted = unquote(raw);
            if unquoted.contains("..")
                || unquoted.contains(['/', '\\', '\0'])
            {
                return Err(MultipartError::InvalidContentDisposition {
                    detail: "filename contains path traversal characters",
                });
            }
            filename = Some(unquoted);
        }
    }

    let name = name.ok_or(MultipartError::InvalidContentDisposition {
        detail: "missing name parameter",
    })?;
    Ok((name, filename))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Vec<Part>, MultipartError> {
        MultipartParser::new("----boundary", MultipartConfig::default()).parse(body.as_bytes())
    }

    #[test]
    fn test_parse_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            parse_boundary(ct).unwrap(),
            "----WebKitFormBoundary7MA4YWxkTrZu0gW"
        );
        let ct = r#"multipart/form-data; Boundary="simple-boundary""#;
        assert_eq!(parse_boundary(ct).unwrap(), "simple-boundary");
    }

    #[test]
    fn test_parse_boundary_errors() {
        assert_eq!(
            parse_boundary("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(
            parse_boundary("application/json"),
            Err(MultipartError::InvalidBoundary)
        );
        let too_long = "a".repeat(MAX_BOUNDARY_LEN + 1);
        assert_eq!(
            parse_boundary(&format!("multipart/form-data; boundary={too_long}")),
            Err(MultipartError::InvalidBoundary)
        );
    }

    #[test]
    fn test_parse_content_disposition() {
        let (name, filename) =
            parse_content_disposition("form-data; Name=\"field\"; FileName=\"upload.txt\"").unwrap();
        assert_eq!(name, "field");
        assert_eq!(filename.as_deref(), Some("upload.txt"));

        assert!(matches!(
            parse_content_disposition("form-data; name=\"f\"; filename=\"../etc/passwd\""),
            Err(MultipartError::InvalidContentDisposition { .. })
        ));
        assert!(matches!(
            parse_content_disposition("form-data"),
            Err(MultipartError::InvalidContentDisposition { .. })
        ));
    }

    #[test]
    fn test_parse_mixed_form() {
        let body = concat!(
            "preamble\r\n",
            "------boundary\r\n",
            "Content-Disposition: form-data; name=\"description\"\r\n",
            "\r\n",
            "A test file\r\n",
            "------boundary\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"data.bin\"\r\n",
            "Content-Type: application/octet-stream\r\n",
            "\r\n",
            "\x00\x01\x02\x03\r\n",
            "------boundary--\r\n"
        );

        let parts = parse(body).unwrap();
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].name, "description");
        assert!(!parts[0].is_file());
        assert_eq!(parts[0].text(), Some("A test file"));

        assert_eq!(parts[1].name, "file");
        assert!(parts[1].is_file());
        assert_eq!(parts[1].filename.as_deref(), Some("data.bin"));
        assert_eq!(
            parts[1].content_type.as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(parts[1].data, vec![0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_boundary_like_text_inside_part_is_data() {
        let body = concat!(
            "------boundary\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n",
            "\r\n",
            "x------boundaryy\r\n",
            "------boundary--\r\n"
        );
        let parts = parse(body).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text(), Some("x------boundaryy"));
    }

    #[test]
    fn test_limits() {
        let body = concat!(
            "------boundary\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
            "\r\n",
            "0123456789\r\n",
            "------boundary--\r\n"
        );
        let parser = MultipartParser::new("----boundary", MultipartConfig::new().max_file_size(4));
        assert_eq!(
            parser.parse(body.as_bytes()),
            Err(MultipartError::FileTooLarge { size: 10, max: 4 })
        );

        let parser = MultipartParser::new("----boundary", MultipartConfig::new().max_fields(0));
        assert!(matches!(
            parser.parse(body.as_bytes()),
            Err(MultipartError::TooManyFields { .. })
        ));

        let parser =
            MultipartParser::new("----boundary", MultipartConfig::new().max_total_size(5));
        assert!(matches!(
            parser.parse(body.as_bytes()),
            Err(MultipartError::TotalTooLarge { .. })
        ));
    }

    #[test]
    fn test_truncated_body() {
        let body = concat!(
            "------boundary\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "value"
        );
        assert_eq!(parse(body), Err(MultipartError::UnexpectedEof));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: MultipartConfig = serde_json::from_str(r#"{"max_fields": 3}"#).unwrap();
        assert_eq!(config.max_fields, 3);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }
}
