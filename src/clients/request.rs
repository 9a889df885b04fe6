//! The single-use request builder and its execution pipeline.
//!
//! A [`Request`] is created by [`RestClient::verb`](crate::RestClient::verb)
//! (or one of the verb shortcuts) and configured by chaining. Chained calls
//! never fail: malformed input is recorded and reported when the request is
//! executed, and every call after the first error is ignored.
//!
//! Executing a request runs these steps in order:
//!
//! 1. a recorded build error is returned without any I/O
//! 2. admission through the client's rate limiter, if it has one
//! 3. URL and header assembly
//! 4. dispatch, bounded by the effective timeout and the cancellation token
//! 5. classification of non-2xx responses into [`ServerError`]
//! 6. for [`Request::execute`], decoding of the JSON body

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::clients::errors::{BuildError, RestError, ServerError};
use crate::clients::http_request::{HttpMethod, ResolvedRequest};
use crate::clients::http_response::RestResponse;
use crate::clients::rest::ClientState;
use crate::clients::selector::Selector;
use crate::config::{header_name, header_value};
use crate::error::ConfigError;

/// Admission waits longer than this are logged at warn level.
const SLOW_ADMISSION: Duration = Duration::from_secs(1);

/// A single HTTP call under construction.
///
/// # Example
///
/// ```rust,ignore
/// use harbor_rest::{ClientConfig, RestClient};
/// use std::time::Duration;
///
/// let client = RestClient::new(
///     ClientConfig::builder()
///         .base_url("https://harbor.example.com")
///         .api_path("/api/v2.0")
///         .build()?,
/// )?;
///
/// let projects: Vec<Project> = client
///     .list()
///     .path("projects")
///     .param("page_size", "50")
///     .selector_param("labelSelector", "env=prod")
///     .timeout(Duration::from_secs(10))
///     .execute()
///     .await?;
/// ```
#[derive(Debug)]
#[must_use = "a request does nothing until `send` or `execute` is awaited"]
pub struct Request {
    client: Arc<ClientState>,
    method: HttpMethod,
    segments: Vec<String>,
    params: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    body: Option<Vec<u8>>,
    cancel: CancellationToken,
    error: Option<BuildError>,
}

impl Request {
    pub(crate) fn new(client: Arc<ClientState>, method: HttpMethod) -> Self {
        Self {
            client,
            method,
            segments: Vec::new(),
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            timeout: None,
            body: None,
            cancel: CancellationToken::new(),
            error: None,
        }
    }

    /// Returns the HTTP method of this request.
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the first recorded build error, if any.
    pub const fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Appends a raw path. It is split on `/` and empty, `.` and `..`
    /// components are dropped, so `"projects/library/repositories"` adds three
    /// segments and a path can never leave the API prefix.
    pub fn path(mut self, path: impl AsRef<str>) -> Self {
        if self.error.is_none() {
            self.segments.extend(
                path.as_ref()
                    .split('/')
                    .filter(|piece| !matches!(*piece, "" | "." | ".."))
                    .map(str::to_string),
            );
        }
        self
    }

    /// Appends one path segment, percent-encoding it.
    ///
    /// Use this for identifiers that come from user input. A segment that is
    /// empty, `.` or `..`, or that contains `/` or `%`, is recorded as a
    /// [`BuildError::InvalidPathSegment`].
    pub fn segment(mut self, segment: impl AsRef<str>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let segment = segment.as_ref();
        match validate_segment(segment) {
            Ok(()) => self.segments.push(urlencoding::encode(segment).into_owned()),
            Err(reason) => {
                self.error = Some(BuildError::InvalidPathSegment {
                    segment: segment.to_string(),
                    reason,
                });
            }
        }
        self
    }

    /// Adds a query parameter. Repeated keys keep every value in call order.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            self.error = Some(BuildError::EmptyParamKey { value });
        } else {
            self.params.entry(key).or_default().push(value);
        }
        self
    }

    /// Parses a label selector and sets it as the query parameter `key`.
    ///
    /// The parameter carries the canonical rendering of the selector, so
    /// equivalent expressions produce the same URL. An empty expression adds
    /// nothing.
    pub fn selector_param(mut self, key: impl Into<String>, expression: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match Selector::parse(expression) {
            Ok(selector) if selector.is_empty() => {}
            Ok(selector) => {
                let key = key.into();
                if key.is_empty() {
                    self.error = Some(BuildError::EmptyParamKey {
                        value: selector.to_string(),
                    });
                } else {
                    self.params.insert(key, vec![selector.to_string()]);
                }
            }
            Err(e) => self.error = Some(e.into()),
        }
        self
    }

    /// Overrides the client's default timeout for this call.
    ///
    /// The timeout covers dispatch only; time spent waiting for the rate
    /// limiter does not count against it.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Serializes `body` as JSON and sets it as the request body.
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        if self.error.is_some() {
            return self;
        }
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(bytes),
            Err(e) => {
                self.error = Some(BuildError::Body {
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Sets an already encoded request body.
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        if self.error.is_none() {
            self.body = Some(body.into());
        }
        self
    }

    /// Sets a header for this call, replacing a client header of the same
    /// name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match header_name(name).and_then(|n| header_value(name, value).map(|v| (n, v))) {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => {
                let reason = match e {
                    ConfigError::InvalidHeader { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.error = Some(BuildError::InvalidHeader {
                    name: name.to_string(),
                    reason,
                });
            }
        }
        self
    }

    /// Binds a cancellation token. Cancelling it aborts the request while it
    /// waits for admission or while it is in flight.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the URL this request will be sent to.
    ///
    /// Query parameters are ordered by key, so the URL is the same no matter
    /// in which order parameters were added.
    #[must_use]
    pub fn url(&self) -> Url {
        let pieces = std::iter::once(self.client.api_path.as_str())
            .chain(self.segments.iter().map(String::as_str));
        let mut url = self.client.base_url.join_path(pieces);

        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, values) in &self.params {
                for value in values {
                    query.append_pair(key, value);
                }
            }
        }
        url
    }

    /// Sends the request and returns the raw response.
    ///
    /// # Errors
    ///
    /// - [`RestError::Build`] if a chained call recorded an error
    /// - [`RestError::AdmissionCancelled`] if cancelled while waiting for the
    ///   rate limiter
    /// - [`RestError::Transport`] if the round trip failed, timed out, or was
    ///   cancelled
    /// - [`RestError::Server`] if the status is not 2xx
    pub async fn send(mut self) -> Result<RestResponse, RestError> {
        if let Some(error) = self.error.take() {
            return Err(error.into());
        }

        self.admit().await?;

        let client = Arc::clone(&self.client);
        let cancel = self.cancel.clone();
        let resolved = self.resolve();
        let method = resolved.method;
        let url = resolved.url.to_string();

        let response = resolved.dispatch(&client.http, &cancel).await?;
        if response.is_success() {
            return Ok(response);
        }

        let error = ServerError::from_body(
            response.status,
            &response.body,
            response.request_id().map(str::to_string),
        );
        tracing::debug!(
            %method,
            url = %url,
            status = error.status,
            reason = %error.reason,
            "server returned an error status"
        );
        Err(error.into())
    }

    /// Sends the request and decodes the JSON response body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so use `()` or `Option<T>` for
    /// endpoints that answer without content.
    ///
    /// # Errors
    ///
    /// Everything [`send`](Self::send) returns, plus [`RestError::Decode`] if
    /// the body does not fit `T`.
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T, RestError> {
        let response = self.send().await?;
        Ok(response.json()?)
    }

    async fn admit(&self) -> Result<(), RestError> {
        let Some(limiter) = &self.client.rate_limiter else {
            return Ok(());
        };

        let started = Instant::now();
        limiter.wait(&self.cancel).await?;
        let waited = started.elapsed();

        if waited > SLOW_ADMISSION {
            tracing::warn!(
                method = %self.method,
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                qps = limiter.qps(),
                "request waited for rate limiter admission"
            );
        } else if waited >= Duration::from_millis(1) {
            tracing::debug!(
                method = %self.method,
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "rate limiter admitted request"
            );
        }
        Ok(())
    }

    fn resolve(self) -> ResolvedRequest {
        let url = self.url();

        let mut headers = self.client.headers.clone();
        if self.body.is_some() {
            headers.insert(CONTENT_TYPE, self.client.content_type.clone());
        }
        headers.insert(ACCEPT, self.client.accept.clone());
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        ResolvedRequest {
            method: self.method,
            url,
            headers,
            body: self.body,
            timeout: self.timeout.or(self.client.timeout),
        }
    }
}

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("segment cannot be empty");
    }
    if segment == "." || segment == ".." {
        return Err("segment cannot be '.' or '..'");
    }
    if segment.contains('/') {
        return Err("segment cannot contain '/'");
    }
    if segment.contains('%') {
        return Err("segment cannot contain '%'");
    }
    Ok(())
}
