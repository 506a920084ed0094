//! Application configuration.
//!
//! [`AppConfig`] is plain data with serde defaults, so an embedding program
//! can fill it from whatever source it likes (a TOML file, environment
//! variables, hard-coded values):
//!
//! ```ignore
//! let config: AppConfig = serde_json::from_str(r#"{"title": "Pets"}"#)?;
//! assert_eq!(config.version, "0.0.1");
//! ```

use bindery_core::MultipartConfig;
use bindery_openapi::{Info, default_error_content_types};
use serde::Deserialize;

/// A server entry for the document's `servers` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Base URL.
    pub url: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Application-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Document title.
    pub title: String,
    /// Document description.
    pub description: String,
    /// API version.
    pub version: String,
    /// Servers listed in the document.
    pub servers: Vec<ServerConfig>,
    /// Content types the error catalogue is documented under.
    pub error_content_types: Vec<String>,
    /// Limits applied while decoding multipart bodies.
    pub multipart: MultipartConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "OpenAPI".to_string(),
            description: "OpenAPI".to_string(),
            version: "0.0.1".to_string(),
            servers: Vec::new(),
            error_content_types: default_error_content_types(),
            multipart: MultipartConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: impl Into<String>) -> Self {
        self.servers.push(ServerConfig {
            url: url.into(),
            description: description.into(),
        });
        self
    }

    /// Replace the error content types.
    #[must_use]
    pub fn error_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set multipart limits.
    #[must_use]
    pub fn multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    pub(crate) fn info(&self) -> Info {
        Info {
            title: self.title.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            version: self.version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.title, "OpenAPI");
        assert_eq!(config.description, "OpenAPI");
        assert_eq!(config.version, "0.0.1");
        assert_eq!(config.error_content_types.len(), 3);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "title": "Pets",
                "servers": [{"url": "http://localhost:6000"}],
                "multipart": {"max_file_size": 1024}
            }"#,
        )
        .unwrap();
        assert_eq!(config.title, "Pets");
        assert_eq!(config.version, "0.0.1");
        assert_eq!(config.servers[0].description, "");
        assert_eq!(config.multipart.max_file_size, 1024);
        assert_eq!(
            config.multipart.max_fields,
            MultipartConfig::default().max_fields
        );
    }

    #[test]
    fn test_empty_description_is_omitted() {
        let info = AppConfig::new().description("").info();
        assert!(info.description.is_none());
    }
}
