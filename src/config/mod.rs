//! Configuration types for the REST client.
//!
//! This module provides the values a [`RestClient`](crate::RestClient) is
//! built from.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: The validated configuration for one logical connection
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`BaseUrl`]: A normalized base URL (trailing `/`, no query, no fragment)
//! - [`ContentConfig`]: Body encoding and accepted response types
//! - [`Transport`]: The HTTP transport the client dispatches through
//!
//! # Example
//!
//! ```rust
//! use harbor_rest::{ClientConfig, ContentConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://harbor.example.com")
//!     .api_path("/api/v2.0")
//!     .content_config(ContentConfig::new())
//!     .basic_auth("admin", "Harbor12345")
//!     .qps(5.0)
//!     .burst(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.base_url().as_str(), "https://harbor.example.com/");
//! ```

mod content;
mod newtypes;

pub use content::{ContentConfig, DEFAULT_CONTENT_TYPE};
pub use newtypes::BaseUrl;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};

use crate::error::ConfigError;
use crate::flowcontrol::RateLimiter;

/// Crate version from Cargo.toml.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The HTTP transport a client dispatches through.
///
/// The choice is made once, when the client is constructed. A custom
/// transport carries its own timeout because `reqwest::Client` does not expose
/// the one it was built with; that timeout becomes the default for every
/// request unless overridden per call.
///
/// # Example
///
/// ```rust
/// use harbor_rest::Transport;
/// use std::time::Duration;
///
/// let client = reqwest::Client::new();
/// let transport = Transport::custom(client).with_timeout(Duration::from_secs(30));
///
/// assert_eq!(transport.timeout(), Some(Duration::from_secs(30)));
/// assert_eq!(Transport::Default.timeout(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub enum Transport {
    /// A rustls-backed `reqwest::Client` created by the library, without a
    /// timeout of its own.
    #[default]
    Default,
    /// A caller-supplied client.
    Custom {
        /// The client used for every call.
        client: reqwest::Client,
        /// Default per-call timeout.
        timeout: Option<Duration>,
    },
}

impl Transport {
    /// Wraps a caller-supplied `reqwest::Client` with no default timeout.
    #[must_use]
    pub const fn custom(client: reqwest::Client) -> Self {
        Self::Custom {
            client,
            timeout: None,
        }
    }

    /// Sets the default timeout of a custom transport. Has no effect on
    /// [`Transport::Default`].
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            Self::Default => Self::Default,
            Self::Custom { client, .. } => Self::Custom {
                client,
                timeout: Some(timeout),
            },
        }
    }

    /// Returns the default per-call timeout of this transport.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Default => None,
            Self::Custom { timeout, .. } => *timeout,
        }
    }

    /// Resolves the transport into the client that will carry requests.
    pub(crate) fn into_client(self) -> Result<reqwest::Client, ConfigError> {
        match self {
            Self::Custom { client, .. } => Ok(client),
            Self::Default => reqwest::Client::builder()
                .use_rustls_tls()
                .build()
                .map_err(|e| ConfigError::Transport {
                    reason: e.to_string(),
                }),
        }
    }
}

/// Validated configuration for a [`RestClient`](crate::RestClient).
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`. An explicitly supplied rate
/// limiter is shared, not copied, between clones.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: BaseUrl,
    api_path: String,
    content: ContentConfig,
    headers: HeaderMap,
    qps: f32,
    burst: u32,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    transport: Transport,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the versioned API path inserted between the base URL and the
    /// resource path.
    #[must_use]
    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    /// Returns the content configuration, with defaults filled in.
    #[must_use]
    pub const fn content_config(&self) -> &ContentConfig {
        &self.content
    }

    /// Returns the headers applied to every request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the maximum sustained queries per second.
    #[must_use]
    pub const fn qps(&self) -> f32 {
        self.qps
    }

    /// Returns the maximum burst for the internally constructed limiter.
    #[must_use]
    pub const fn burst(&self) -> u32 {
        self.burst
    }

    /// Returns the explicitly supplied rate limiter, if any.
    #[must_use]
    pub fn rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Returns the configured transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn into_parts(self) -> ConfigParts {
        ConfigParts {
            base_url: self.base_url,
            api_path: self.api_path,
            content: self.content,
            headers: self.headers,
            qps: self.qps,
            burst: self.burst,
            rate_limiter: self.rate_limiter,
            transport: self.transport,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_path", &self.api_path)
            .field("content", &self.content)
            .field("headers", &self.headers)
            .field("qps", &self.qps)
            .field("burst", &self.burst)
            .field("rate_limiter", &self.rate_limiter)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Owned pieces of a [`ClientConfig`], consumed by the client factory.
pub(crate) struct ConfigParts {
    pub(crate) base_url: BaseUrl,
    pub(crate) api_path: String,
    pub(crate) content: ContentConfig,
    pub(crate) headers: HeaderMap,
    pub(crate) qps: f32,
    pub(crate) burst: u32,
    pub(crate) rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub(crate) transport: Transport,
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// `base_url` is the only required field.
///
/// # Defaults
///
/// - `api_path`: empty
/// - `content_config`: JSON
/// - `qps`: `0.0` (no internal rate limiter)
/// - `burst`: `10`
/// - `rate_limiter`: `None`
/// - `transport`: [`Transport::Default`]
/// - `User-Agent`: `harbor-rest v{version} | Rust {rust-version}`
///
/// Headers are applied in this order, later entries replacing earlier ones:
/// `User-Agent`, `Authorization` (from [`basic_auth`](Self::basic_auth) or
/// [`bearer_token`](Self::bearer_token)), then headers from
/// [`header`](Self::header).
#[derive(Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_path: Option<String>,
    content: Option<ContentConfig>,
    headers: Vec<(String, String)>,
    authorization: Option<Authorization>,
    user_agent_prefix: Option<String>,
    qps: Option<f32>,
    burst: Option<u32>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    transport: Option<Transport>,
}

enum Authorization {
    Basic { username: String, password: String },
    Bearer(String),
}

impl ClientConfigBuilder {
    /// The burst used when none is configured.
    pub const DEFAULT_BURST: u32 = 10;

    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the versioned API path, e.g. `/api/v2.0`.
    #[must_use]
    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = Some(path.into());
        self
    }

    /// Sets the body encoding configuration.
    #[must_use]
    pub fn content_config(mut self, content: ContentConfig) -> Self {
        self.content = Some(content);
        self
    }

    /// Adds a static header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds several static headers at once.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Authenticates every request with HTTP basic auth.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.authorization = Some(Authorization::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Authenticates every request with a bearer token.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(Authorization::Bearer(token.into()));
        self
    }

    /// Sets a prefix for the `User-Agent` header.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the maximum sustained queries per second. Zero or a negative
    /// value disables the internal rate limiter.
    #[must_use]
    pub const fn qps(mut self, qps: f32) -> Self {
        self.qps = Some(qps);
        self
    }

    /// Sets the maximum burst of the internal rate limiter.
    #[must_use]
    pub const fn burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Supplies a rate limiter, possibly shared with other clients.
    ///
    /// An explicit limiter takes precedence over [`qps`](Self::qps) and
    /// [`burst`](Self::burst): it is used as-is even when `qps` is positive.
    #[must_use]
    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Sets the HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the [`ClientConfig`], validating every field.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingRequiredField`] if `base_url` is not set
    /// - [`ConfigError::InvalidBaseUrl`] if the base URL is unusable
    /// - [`ConfigError::UnsupportedContentType`] for non-JSON content types
    /// - [`ConfigError::InvalidHeader`] for invalid header names or values
    /// - [`ConfigError::InvalidRateLimit`] if `qps` is NaN or infinite
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;
        let base_url = BaseUrl::parse(base_url)?;

        let content = self.content.unwrap_or_default().normalized()?;

        let qps = self.qps.unwrap_or(0.0);
        if !qps.is_finite() {
            return Err(ConfigError::InvalidRateLimit {
                reason: format!("qps must be a finite number, got {qps}"),
            });
        }

        let mut headers = HeaderMap::new();
        let prefix = self
            .user_agent_prefix
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent = format!("{prefix}harbor-rest v{CLIENT_VERSION} | Rust {rust_version}");
        headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), &user_agent)?);

        if let Some(authorization) = self.authorization {
            let credentials = match authorization {
                Authorization::Basic { username, password } => {
                    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
                }
                Authorization::Bearer(token) => format!("Bearer {token}"),
            };
            let mut value = header_value(AUTHORIZATION.as_str(), &credentials)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &self.headers {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }

        Ok(ClientConfig {
            base_url,
            api_path: self.api_path.unwrap_or_default(),
            content,
            headers,
            qps,
            burst: self.burst.unwrap_or(Self::DEFAULT_BURST),
            rate_limiter: self.rate_limiter,
            transport: self.transport.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("base_url", &self.base_url)
            .field("api_path", &self.api_path)
            .field("content", &self.content)
            .field("headers", &self.headers)
            .field("has_authorization", &self.authorization.is_some())
            .field("user_agent_prefix", &self.user_agent_prefix)
            .field("qps", &self.qps)
            .field("burst", &self.burst)
            .field("rate_limiter", &self.rate_limiter)
            .field("transport", &self.transport)
            .finish()
    }
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
