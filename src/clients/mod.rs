//! Request building, execution and error types.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`RestClient`]: The long-lived client that creates requests
//! - [`Request`]: A single-use builder for one HTTP call
//! - [`RestResponse`]: A complete response with status, headers and body
//! - [`HttpMethod`]: Supported HTTP methods (GET, POST, PUT, DELETE)
//! - [`RestError`]: The error returned when executing a request
//! - [`selector::Selector`]: Parsed label selector expressions
//!
//! # Retry Behavior
//!
//! Requests are attempted exactly once. Rate limiting happens before dispatch
//! through the client's [`RateLimiter`](crate::flowcontrol::RateLimiter); no
//! response status triggers a retry.

mod errors;
mod http_request;
mod http_response;
mod request;
pub mod rest;
pub mod selector;

pub use errors::{
    AdmissionCancelled, BuildError, DecodeError, ErrorKind, RestError, SelectorError,
    ServerError, TransportError, TransportErrorKind,
};
pub use http_request::HttpMethod;
pub use http_response::{RestResponse, REQUEST_ID_HEADER};
pub use request::Request;
pub use rest::{RestClient, RestInterface};
