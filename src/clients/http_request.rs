//! HTTP verbs and the resolved, ready-to-send form of a request.
//!
//! [`Request`](crate::Request) accumulates builder input; when executed it is
//! turned into a [`ResolvedRequest`], an immutable value holding exactly what
//! goes on the wire.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::clients::errors::TransportError;
use crate::clients::http_response::RestResponse;

/// HTTP methods supported by the REST client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating resources.
    Post,
    /// HTTP PUT method for updating resources.
    Put,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// A fully assembled request.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedRequest {
    pub(crate) method: HttpMethod,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) timeout: Option<Duration>,
}

impl ResolvedRequest {
    /// Sends the request and reads the whole response body.
    ///
    /// The timeout covers the round trip including the body. Cancellation
    /// drops the in-flight future, which releases the connection.
    pub(crate) async fn dispatch(
        self,
        http: &reqwest::Client,
        cancel: &CancellationToken,
    ) -> Result<RestResponse, TransportError> {
        let method = self.method.as_str();
        let url = self.url.to_string();

        let mut builder = http
            .request(self.method.into(), self.url)
            .headers(self.headers);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let started = Instant::now();
        let round_trip = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RestResponse::new(status, headers, body.to_vec()))
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(method, url = %url, "request cancelled in flight");
                return Err(TransportError::cancelled(method, &url));
            }
            result = round_trip => {
                result.map_err(|e| TransportError::from_reqwest(method, &url, e))?
            }
        };

        tracing::debug!(
            method,
            url = %url,
            status = response.status,
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );

        Ok(response)
    }
}
