//! The raw response type returned by [`Request::send`](crate::Request::send).

use std::any::type_name;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::clients::errors::DecodeError;

/// Header carrying the server-assigned request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A complete HTTP response: status, headers and the full body.
///
/// # Example
///
/// ```rust
/// use harbor_rest::RestResponse;
/// use reqwest::header::HeaderMap;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Project {
///     name: String,
/// }
///
/// let response = RestResponse::new(200, HeaderMap::new(), br#"{"name":"library"}"#.to_vec());
/// assert!(response.is_success());
///
/// let project: Project = response.json().unwrap();
/// assert_eq!(project.name, "library");
/// ```
#[derive(Clone, Debug)]
pub struct RestResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl RestResponse {
    /// Creates a new response.
    #[must_use]
    pub const fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns `true` if the status code is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the JSON body into `T`.
    ///
    /// An empty (or whitespace-only) body decodes as JSON `null`, so `()` and
    /// `Option<T>` targets accept `204 No Content` responses.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the body does not fit `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };

        serde_json::from_slice(body).map_err(|source| DecodeError {
            status: self.status,
            target: type_name::<T>(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Repository {
        name: String,
        artifact_count: u32,
    }

    #[test]
    fn test_is_success_boundaries() {
        assert!(!RestResponse::new(199, HeaderMap::new(), vec![]).is_success());
        assert!(RestResponse::new(200, HeaderMap::new(), vec![]).is_success());
        assert!(RestResponse::new(204, HeaderMap::new(), vec![]).is_success());
        assert!(RestResponse::new(299, HeaderMap::new(), vec![]).is_success());
        assert!(!RestResponse::new(300, HeaderMap::new(), vec![]).is_success());
        assert!(!RestResponse::new(404, HeaderMap::new(), vec![]).is_success());
    }

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-Id", HeaderValue::from_static("abc-123"));
        let response = RestResponse::new(200, headers, vec![]);

        assert_eq!(response.request_id(), Some("abc-123"));
        assert_eq!(RestResponse::new(200, HeaderMap::new(), vec![]).request_id(), None);
    }

    #[test]
    fn test_json_decodes_body() {
        let response = RestResponse::new(
            200,
            HeaderMap::new(),
            br#"{"name":"library/nginx","artifact_count":3}"#.to_vec(),
        );

        let repository: Repository = response.json().unwrap();
        assert_eq!(
            repository,
            Repository {
                name: "library/nginx".to_string(),
                artifact_count: 3,
            }
        );
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let response = RestResponse::new(204, HeaderMap::new(), vec![]);
        response.json::<()>().unwrap();
        assert_eq!(response.json::<Option<Repository>>().unwrap(), None);

        let response = RestResponse::new(200, HeaderMap::new(), b"  \n".to_vec());
        assert_eq!(response.json::<Option<u32>>().unwrap(), None);
    }

    #[test]
    fn test_json_mismatch_is_decode_error() {
        let response = RestResponse::new(200, HeaderMap::new(), br#"{"name":1}"#.to_vec());
        let error = response.json::<Repository>().unwrap_err();

        assert_eq!(error.status, 200);
        assert!(error.target.ends_with("Repository"));
    }

    #[test]
    fn test_text_is_lossy() {
        let response = RestResponse::new(500, HeaderMap::new(), vec![b'o', b'k', 0xff]);
        assert!(response.text().starts_with("ok"));
    }
}
