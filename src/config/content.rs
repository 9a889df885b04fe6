//! Body encoding settings.

use crate::error::ConfigError;

/// The content type used when none is configured.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Describes how request and response bodies are encoded.
///
/// `ContentConfig` is a small immutable value consumed by every request: the
/// content type becomes the `Content-Type` of request bodies and the accept
/// types become the `Accept` header. Bodies are (de)serialized as JSON, so the
/// content type must be a JSON media type (`application/json` or any
/// `+json` suffix type).
///
/// # Example
///
/// ```rust
/// use harbor_rest::ContentConfig;
///
/// let content = ContentConfig::new()
///     .with_accept_content_types("application/json, application/problem+json");
///
/// assert_eq!(content.content_type(), "application/json");
/// assert_eq!(
///     content.accept_content_types(),
///     "application/json, application/problem+json"
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentConfig {
    content_type: Option<String>,
    accept_content_types: Option<String>,
}

impl ContentConfig {
    /// Creates a config that uses the default JSON content type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content type for request bodies.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the value sent in the `Accept` header.
    #[must_use]
    pub fn with_accept_content_types(mut self, accept: impl Into<String>) -> Self {
        self.accept_content_types = Some(accept.into());
        self
    }

    /// Returns the content type, falling back to [`DEFAULT_CONTENT_TYPE`].
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self.content_type.as_deref().map(str::trim) {
            Some(content_type) if !content_type.is_empty() => content_type,
            _ => DEFAULT_CONTENT_TYPE,
        }
    }

    /// Returns the accepted response types, falling back to the content type.
    #[must_use]
    pub fn accept_content_types(&self) -> &str {
        match self.accept_content_types.as_deref().map(str::trim) {
            Some(accept) if !accept.is_empty() => accept,
            _ => self.content_type(),
        }
    }

    /// Fills in defaults and checks that the content type is JSON.
    pub(crate) fn normalized(self) -> Result<Self, ConfigError> {
        let content_type = self.content_type().to_string();
        if !is_json_media_type(&content_type) {
            return Err(ConfigError::UnsupportedContentType { content_type });
        }
        let accept_content_types = self.accept_content_types().to_string();
        Ok(Self {
            content_type: Some(content_type),
            accept_content_types: Some(accept_content_types),
        })
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.contains('/') && essence.ends_with("+json"))
}
