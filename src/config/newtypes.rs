//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers that validate and normalize their
//! contents on construction. Invalid values are rejected with clear error messages.

use std::fmt;

use url::Url;

use crate::error::ConfigError;

/// A normalized base URL for REST calls.
///
/// The base URL is the root every request path is appended to. On
/// construction it is copied and normalized so that it always represents a
/// pure path prefix:
///
/// - the path ends with exactly one `/`
/// - any query string is removed
/// - any fragment is removed
///
/// Only absolute `http` and `https` URLs are accepted.
///
/// # Example
///
/// ```rust
/// use harbor_rest::BaseUrl;
///
/// let base = BaseUrl::parse("https://harbor.example.com/registry?x=1#top").unwrap();
/// assert_eq!(base.as_str(), "https://harbor.example.com/registry/");
///
/// let base = BaseUrl::parse("https://harbor.example.com").unwrap();
/// assert_eq!(base.as_str(), "https://harbor.example.com/");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Parses and normalizes a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL cannot be parsed,
    /// is not `http`/`https`, or cannot be used as a base.
    pub fn parse(url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = url.as_ref().trim();
        let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_url(&parsed)
    }

    /// Normalizes a copy of an already parsed URL. The caller's value is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL is not `http`/`https`
    /// or cannot be used as a base.
    pub fn from_url(url: &Url) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("URL has no host to serve as a base"));
        }

        let mut base = url.clone();
        let path = format!("{}/", base.path().trim_end_matches('/'));
        base.set_path(&path);
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self(base))
    }

    /// Returns the normalized URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the normalized URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Builds an absolute URL by joining this base path with the given
    /// path pieces.
    ///
    /// Pieces are split on `/`; empty, `.` and `..` components are dropped, so
    /// `"api/v2.0/"` followed by `"/projects"` yields `/api/v2.0/projects` and
    /// no piece can climb above the base path.
    pub(crate) fn join_path<'a, I>(&self, pieces: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut joined = String::new();
        let components = self
            .0
            .path()
            .split('/')
            .chain(pieces.into_iter().flat_map(|piece| piece.split('/')))
            .filter(|component| !matches!(*component, "" | "." | ".."));
        for component in components {
            joined.push('/');
            joined.push_str(component);
        }
        if joined.is_empty() {
            joined.push('/');
        }

        let mut url = self.0.clone();
        url.set_path(&joined);
        url
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
