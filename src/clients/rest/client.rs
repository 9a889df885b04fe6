//! The REST client factory.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::clients::http_request::HttpMethod;
use crate::clients::request::Request;
use crate::config::{header_value, BaseUrl, ClientConfig, ContentConfig};
use crate::error::ConfigError;
use crate::flowcontrol::{RateLimiter, TokenBucketRateLimiter};

/// The verb surface of a REST client.
///
/// Typed sub-clients can depend on this trait instead of [`RestClient`], which
/// lets tests substitute their own implementation.
pub trait RestInterface: Send + Sync {
    /// Starts a request with the given method.
    fn verb(&self, method: HttpMethod) -> Request;

    /// Starts a GET request.
    fn get(&self) -> Request {
        self.verb(HttpMethod::Get)
    }

    /// Starts a POST request.
    fn post(&self) -> Request {
        self.verb(HttpMethod::Post)
    }

    /// Starts a PUT request.
    fn put(&self) -> Request {
        self.verb(HttpMethod::Put)
    }

    /// Starts a DELETE request.
    fn delete(&self) -> Request {
        self.verb(HttpMethod::Delete)
    }

    /// Starts a GET request for a collection.
    fn list(&self) -> Request {
        self.verb(HttpMethod::Get)
    }
}

/// Everything a [`Request`] needs from the client that created it.
#[derive(Debug)]
pub(crate) struct ClientState {
    pub(crate) base_url: BaseUrl,
    pub(crate) api_path: String,
    pub(crate) content: ContentConfig,
    pub(crate) headers: HeaderMap,
    pub(crate) content_type: HeaderValue,
    pub(crate) accept: HeaderValue,
    pub(crate) rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub(crate) http: reqwest::Client,
    pub(crate) timeout: Option<Duration>,
}

/// A long-lived REST client.
///
/// Cloning is cheap and clones share everything, including the rate limiter,
/// so one limiter bounds the combined throughput of all clones.
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use harbor_rest::{ClientConfig, RestClient};
///
/// let config = ClientConfig::builder()
///     .base_url("https://harbor.example.com")
///     .api_path("/api/v2.0")
///     .basic_auth("admin", "Harbor12345")
///     .qps(5.0)
///     .burst(10)
///     .build()?;
///
/// let client = RestClient::new(config)?;
///
/// let project: Project = client.get().path("projects").segment("library").execute().await?;
///
/// client
///     .delete()
///     .path("projects/library/repositories")
///     .segment("nginx")
///     .execute::<()>()
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct RestClient {
    state: Arc<ClientState>,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a client from a validated configuration.
    ///
    /// The rate limiter is chosen as follows:
    ///
    /// 1. an explicitly configured limiter is used as-is, whatever `qps` says
    /// 2. otherwise a positive `qps` creates a [`TokenBucketRateLimiter`]
    ///    with the configured burst
    /// 3. otherwise requests are never throttled
    ///
    /// No network I/O is performed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the content headers are not valid header
    /// values or the default transport cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let parts = config.into_parts();

        let rate_limiter = match parts.rate_limiter {
            Some(limiter) => Some(limiter),
            None if parts.qps > 0.0 => Some(Arc::new(TokenBucketRateLimiter::new(
                parts.qps,
                parts.burst,
            )?) as Arc<dyn RateLimiter>),
            None => None,
        };

        let content_type = header_value(CONTENT_TYPE.as_str(), parts.content.content_type())?;
        let accept = header_value(ACCEPT.as_str(), parts.content.accept_content_types())?;
        let timeout = parts.transport.timeout();
        let http = parts.transport.into_client()?;

        tracing::debug!(
            base_url = %parts.base_url,
            api_path = %parts.api_path,
            rate_limited = rate_limiter.is_some(),
            qps = rate_limiter.as_ref().map_or(0.0, |l| l.qps()),
            "created REST client"
        );

        Ok(Self {
            state: Arc::new(ClientState {
                base_url: parts.base_url,
                api_path: parts.api_path,
                content: parts.content,
                headers: parts.headers,
                content_type,
                accept,
                rate_limiter,
                http,
                timeout,
            }),
        })
    }

    /// Starts a request with the given method.
    pub fn verb(&self, method: HttpMethod) -> Request {
        Request::new(Arc::clone(&self.state), method)
    }

    /// Starts a GET request.
    pub fn get(&self) -> Request {
        self.verb(HttpMethod::Get)
    }

    /// Starts a POST request.
    pub fn post(&self) -> Request {
        self.verb(HttpMethod::Post)
    }

    /// Starts a PUT request.
    pub fn put(&self) -> Request {
        self.verb(HttpMethod::Put)
    }

    /// Starts a DELETE request.
    pub fn delete(&self) -> Request {
        self.verb(HttpMethod::Delete)
    }

    /// Starts a GET request for a collection.
    pub fn list(&self) -> Request {
        self.verb(HttpMethod::Get)
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &BaseUrl {
        &self.state.base_url
    }

    /// Returns the API path prefix.
    #[must_use]
    pub fn api_path(&self) -> &str {
        &self.state.api_path
    }

    /// Returns the content configuration.
    #[must_use]
    pub fn content_config(&self) -> &ContentConfig {
        &self.state.content
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.state.headers
    }

    /// Returns the rate limiter shared by every request of this client.
    #[must_use]
    pub fn rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.state.rate_limiter.as_ref()
    }

    /// Returns the default per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.state.timeout
    }
}

impl RestInterface for RestClient {
    fn verb(&self, method: HttpMethod) -> Request {
        Self::verb(self, method)
    }
}
