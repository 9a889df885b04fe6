//! Error types for REST calls.
//!
//! Every stage of the request pipeline has its own error type:
//!
//! - [`BuildError`]: malformed builder input, reported before any I/O
//! - [`AdmissionCancelled`]: cancelled while waiting for the rate limiter
//! - [`TransportError`]: the round trip itself failed (connect, timeout, cancel)
//! - [`ServerError`]: the server answered with a non-2xx status
//! - [`DecodeError`]: a 2xx body did not fit the expected type
//! - [`RestError`]: unified error type encompassing all of the above
//!
//! None of these are retried or recovered internally.
//!
//! # Example
//!
//! ```rust,ignore
//! use harbor_rest::{RestError, ErrorKind};
//!
//! match client.get().path("users/42").execute::<User>().await {
//!     Ok(user) => println!("found {}", user.username),
//!     Err(e) if e.is_not_found() => println!("no such user"),
//!     Err(RestError::Server(e)) => {
//!         println!("API error {} {}: {}", e.status, e.reason, e.message);
//!     }
//!     Err(e) if e.kind() == ErrorKind::Transport => println!("network trouble: {e}"),
//!     Err(e) => println!("request failed: {e}"),
//! }
//! ```

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use crate::clients::selector::SelectorError;
pub use crate::flowcontrol::AdmissionCancelled;

/// Error recorded while chaining builder calls and reported on execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A selector expression could not be parsed.
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    /// A path segment is not usable as a single URL segment.
    #[error("Invalid path segment '{segment}': {reason}")]
    InvalidPathSegment {
        /// The rejected segment.
        segment: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A query parameter has an empty key.
    #[error("Query parameter key cannot be empty (value '{value}').")]
    EmptyParamKey {
        /// The value that was supplied with the empty key.
        value: String,
    },

    /// A per-call header has an invalid name or value.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// The request body could not be serialized.
    #[error("Cannot serialize request body: {reason}")]
    Body {
        /// The serializer error message.
        reason: String,
    },
}

/// What went wrong during the network round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The effective timeout elapsed before the response was complete.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The caller cancelled the request while it was in flight.
    Cancelled,
    /// The response body could not be read.
    Body,
    /// Any other failure reported by the HTTP implementation.
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Timeout => "timed out",
            Self::Connect => "connection failed",
            Self::Cancelled => "cancelled",
            Self::Body => "failed reading response body",
            Self::Request => "request failed",
        };
        f.write_str(text)
    }
}

/// The round trip failed without a server response to report.
#[derive(Debug, Error)]
#[error("{method} {url}: {kind}")]
pub struct TransportError {
    /// The failure category.
    pub kind: TransportErrorKind,
    /// The HTTP method of the call.
    pub method: String,
    /// The URL that was being called.
    pub url: String,
    /// The underlying HTTP error, absent for cancellations.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl TransportError {
    pub(crate) fn from_reqwest(method: &str, url: &str, error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Request
        };
        Self {
            kind,
            method: method.to_string(),
            url: url.to_string(),
            source: Some(error),
        }
    }

    pub(crate) fn cancelled(method: &str, url: &str) -> Self {
        Self {
            kind: TransportErrorKind::Cancelled,
            method: method.to_string(),
            url: url.to_string(),
            source: None,
        }
    }
}

/// The server answered with a non-success status.
///
/// `reason` and `message` come from the response body when it is a status
/// payload, either `{"reason": ..., "message": ...}` or
/// `{"errors": [{"code": ..., "message": ...}]}`. Otherwise the reason is the
/// canonical reason phrase of the status code and the message is the raw body
/// (or a generic sentence when the body is empty).
///
/// # Example
///
/// ```rust
/// use harbor_rest::ServerError;
///
/// let error = ServerError::from_body(404, br#"{"errors":[{"code":"NOT_FOUND","message":"user 7 not found"}]}"#, None);
/// assert_eq!(error.status, 404);
/// assert_eq!(error.reason, "NOT_FOUND");
/// assert_eq!(error.message, "user 7 not found");
///
/// let error = ServerError::from_body(502, b"", None);
/// assert_eq!(error.reason, "Bad Gateway");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("server responded with {status} {reason}: {message}")]
pub struct ServerError {
    /// The HTTP status code.
    pub status: u16,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
    /// The raw response body, lossily decoded as UTF-8.
    pub body: String,
    /// The `X-Request-Id` response header, if present.
    pub request_id: Option<String>,
}

impl ServerError {
    /// Builds a server error from a response status and body.
    #[must_use]
    pub fn from_body(status: u16, body: &[u8], request_id: Option<String>) -> Self {
        let text = String::from_utf8_lossy(body).into_owned();
        let payload = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| status_payload(&value));

        let (reason, message) = payload.unwrap_or_else(|| {
            let reason = StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .unwrap_or("Unknown")
                .to_string();
            let trimmed = text.trim();
            let message = if trimmed.is_empty() {
                format!("the server responded with status code {status}")
            } else {
                trimmed.to_string()
            };
            (reason, message)
        });

        Self {
            status,
            reason,
            message,
            body: text,
            request_id,
        }
    }
}

/// Extracts `(reason, message)` from a structured error body.
fn status_payload(value: &Value) -> Option<(String, String)> {
    let text = |v: Option<&Value>| -> Option<String> {
        match v? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let first = errors.first()?;
        let reason = text(first.get("code")).unwrap_or_default();
        let messages: Vec<String> = errors
            .iter()
            .filter_map(|error| text(error.get("message")))
            .collect();
        if reason.is_empty() && messages.is_empty() {
            return None;
        }
        return Some((reason, messages.join("; ")));
    }

    let reason = text(value.get("reason"));
    let message = text(value.get("message"));
    if reason.is_none() && message.is_none() {
        return None;
    }
    Some((reason.unwrap_or_default(), message.unwrap_or_default()))
}

/// A success response whose body does not fit the expected type.
#[derive(Debug, Error)]
#[error("Cannot decode {status} response body into {target}: {source}")]
pub struct DecodeError {
    /// The HTTP status code of the response.
    pub status: u16,
    /// The Rust type the body was decoded into.
    pub target: &'static str,
    /// The deserializer error.
    #[source]
    pub source: serde_json::Error,
}

/// Machine-readable category of a [`RestError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BuildError`].
    Build,
    /// See [`AdmissionCancelled`].
    AdmissionCancelled,
    /// See [`TransportError`].
    Transport,
    /// See [`ServerError`].
    Server,
    /// See [`DecodeError`].
    Decode,
}

impl ErrorKind {
    /// Returns a stable identifier for the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "BuildError",
            Self::AdmissionCancelled => "AdmissionCancelled",
            Self::Transport => "TransportError",
            Self::Server => "ServerError",
            Self::Decode => "DecodeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for REST calls.
#[derive(Debug, Error)]
pub enum RestError {
    /// Builder input was malformed; no request was sent.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Cancelled while waiting for rate limiter admission; no request was sent.
    #[error(transparent)]
    AdmissionCancelled(#[from] AdmissionCancelled),

    /// The round trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned a non-success status.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The success body did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl RestError {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Build(_) => ErrorKind::Build,
            Self::AdmissionCancelled(_) => ErrorKind::AdmissionCancelled,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Server(_) => ErrorKind::Server,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Returns the HTTP status code, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server(e) => Some(e.status),
            Self::Decode(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns the server-reported reason, or the error category name.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Server(e) => &e.reason,
            other => other.kind().as_str(),
        }
    }

    /// Returns a human-readable message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Server(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns `true` for a 404 response.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Returns `true` for a 409 response.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(409))
    }

    /// Returns `true` for a 401 response.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401))
    }

    /// Returns `true` for a 403 response.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self.status(), Some(403))
    }

    /// Returns `true` if the round trip exceeded its timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.kind == TransportErrorKind::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_from_harbor_payload() {
        let body = br#"{"errors":[{"code":"NOT_FOUND","message":"project 12 not found"}]}"#;
        let error = ServerError::from_body(404, body, Some("req-1".to_string()));

        assert_eq!(error.status, 404);
        assert_eq!(error.reason, "NOT_FOUND");
        assert_eq!(error.message, "project 12 not found");
        assert_eq!(error.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_server_error_joins_multiple_messages() {
        let body = br#"{"errors":[{"code":"BAD_REQUEST","message":"name is required"},{"code":"BAD_REQUEST","message":"email is invalid"}]}"#;
        let error = ServerError::from_body(400, body, None);

        assert_eq!(error.reason, "BAD_REQUEST");
        assert_eq!(error.message, "name is required; email is invalid");
    }

    #[test]
    fn test_server_error_from_status_payload() {
        let body = br#"{"kind":"Status","code":409,"reason":"AlreadyExists","message":"user alice already exists"}"#;
        let error = ServerError::from_body(409, body, None);

        assert_eq!(error.reason, "AlreadyExists");
        assert_eq!(error.message, "user alice already exists");
    }

    #[test]
    fn test_server_error_synthesized_for_plain_body() {
        let error = ServerError::from_body(500, b"upstream exploded\n", None);

        assert_eq!(error.reason, "Internal Server Error");
        assert_eq!(error.message, "upstream exploded");
        assert_eq!(error.body, "upstream exploded\n");
    }

    #[test]
    fn test_server_error_synthesized_for_empty_body() {
        let error = ServerError::from_body(503, b"", None);

        assert_eq!(error.reason, "Service Unavailable");
        assert!(error.message.contains("503"));
    }

    #[test]
    fn test_server_error_ignores_unrelated_json() {
        let error = ServerError::from_body(418, br#"{"teapot":true}"#, None);
        assert_eq!(error.reason, "I'm a teapot");
        assert_eq!(error.message, r#"{"teapot":true}"#);
    }

    #[test]
    fn test_server_error_display() {
        let error = ServerError::from_body(403, br#"{"reason":"Forbidden","message":"no access"}"#, None);
        assert_eq!(error.to_string(), "server responded with 403 Forbidden: no access");
    }

    #[test]
    fn test_rest_error_accessors_for_server_error() {
        let error: RestError = ServerError::from_body(
            404,
            br#"{"errors":[{"code":"NOT_FOUND","message":"gone"}]}"#,
            None,
        )
        .into();

        assert_eq!(error.kind(), ErrorKind::Server);
        assert_eq!(error.status(), Some(404));
        assert_eq!(error.reason(), "NOT_FOUND");
        assert_eq!(error.message(), "gone");
        assert!(error.is_not_found());
        assert!(!error.is_conflict());
    }

    #[test]
    fn test_rest_error_accessors_for_build_error() {
        let error: RestError = BuildError::EmptyParamKey {
            value: "x".to_string(),
        }
        .into();

        assert_eq!(error.kind(), ErrorKind::Build);
        assert_eq!(error.status(), None);
        assert_eq!(error.reason(), "BuildError");
        assert!(error.message().contains("cannot be empty"));
    }

    #[test]
    fn test_rest_error_from_admission_cancelled() {
        let error: RestError = AdmissionCancelled.into();
        assert_eq!(error.kind(), ErrorKind::AdmissionCancelled);
        assert_eq!(error.reason(), "AdmissionCancelled");
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_transport_error_cancelled_display() {
        let error = TransportError::cancelled("GET", "https://harbor.example.com/api/v2.0/users");
        assert_eq!(error.kind, TransportErrorKind::Cancelled);
        assert_eq!(
            error.to_string(),
            "GET https://harbor.example.com/api/v2.0/users: cancelled"
        );
        assert!(std::error::Error::source(&error).is_none());
    }

    #[test]
    fn test_decode_error_reports_target() {
        let source = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let error = DecodeError {
            status: 200,
            target: "u32",
            source,
        };
        let message = error.to_string();
        assert!(message.contains("200"));
        assert!(message.contains("u32"));
    }

    #[test]
    fn test_selector_error_converts_to_build_error() {
        let selector_error = SelectorError {
            expression: "a in (".to_string(),
            reason: "missing ')'".to_string(),
        };
        let error: BuildError = selector_error.into();
        assert!(matches!(error, BuildError::InvalidSelector(_)));
        assert!(error.to_string().contains("a in ("));
    }

    #[test]
    fn test_error_types_implement_std_error() {
        let _: &dyn std::error::Error = &BuildError::Body {
            reason: "test".to_string(),
        };
        let _: &dyn std::error::Error = &ServerError::from_body(400, b"", None);
        let _: &dyn std::error::Error = &RestError::AdmissionCancelled(AdmissionCancelled);
    }
}
