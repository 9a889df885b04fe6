//! Configuration error types.
//!
//! Everything that can go wrong while assembling a [`ClientConfig`] or a
//! [`RestClient`] is reported as a [`ConfigError`]. Construction never
//! performs network I/O, so these errors always describe a structural problem
//! with the supplied values.
//!
//! # Example
//!
//! ```rust
//! use harbor_rest::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::parse("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```
//!
//! [`ClientConfig`]: crate::ClientConfig
//! [`RestClient`]: crate::RestClient

use thiserror::Error;

/// Errors that can occur while configuring a REST client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL could not be parsed or cannot serve as a path prefix.
    #[error("Invalid base URL '{url}': {reason}. Expected an absolute URL such as 'https://harbor.example.com'.")]
    InvalidBaseUrl {
        /// The URL that was provided.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// A static header has an invalid name or value.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// The configured content type cannot be encoded or decoded by the client.
    #[error("Unsupported content type '{content_type}'. Only JSON media types (e.g., 'application/json') are supported.")]
    UnsupportedContentType {
        /// The content type that was configured.
        content_type: String,
    },

    /// The rate limit settings are not usable.
    #[error("Invalid rate limit: {reason}")]
    InvalidRateLimit {
        /// Why the settings were rejected.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The default HTTP transport could not be created.
    #[error("Failed to create HTTP transport: {reason}")]
    Transport {
        /// The underlying failure.
        reason: String,
    },
}
