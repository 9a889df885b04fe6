//! # harbor-rest
//!
//! The core of a REST client for JSON APIs such as the Harbor container
//! registry: a shareable client factory, a per-call request builder, and
//! client-side rate limiting with a token bucket.
//!
//! ## Overview
//!
//! This crate provides:
//! - Validated configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - A cheaply cloneable [`RestClient`] that creates [`Request`] builders
//! - Deferred builder errors: chained calls never fail, execution reports the
//!   first problem before any I/O
//! - Client-side admission control through [`flowcontrol::RateLimiter`]
//! - Cancellation of waiting or in-flight requests with a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - Typed errors that separate transport failures from server responses
//!
//! ## Quick Start
//!
//! ```rust
//! use harbor_rest::{ClientConfig, RestClient};
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://harbor.example.com")
//!     .api_path("/api/v2.0")
//!     .basic_auth("admin", "Harbor12345")
//!     .qps(5.0)
//!     .burst(10)
//!     .build()
//!     .unwrap();
//!
//! let client = RestClient::new(config).unwrap();
//!
//! let request = client.get().path("projects").segment("library");
//! assert_eq!(
//!     request.url().as_str(),
//!     "https://harbor.example.com/api/v2.0/projects/library"
//! );
//! ```
//!
//! ## Making API Requests
//!
//! ```rust,ignore
//! use harbor_rest::{ClientConfig, RestClient};
//! use serde::Deserialize;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Deserialize)]
//! struct Repository {
//!     name: String,
//!     artifact_count: u64,
//! }
//!
//! let client = RestClient::new(config)?;
//! let cancel = CancellationToken::new();
//!
//! let repositories: Vec<Repository> = client
//!     .list()
//!     .path("projects/library/repositories")
//!     .param("page_size", "100")
//!     .with_cancellation(cancel.clone())
//!     .execute()
//!     .await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Rate limiters are passed explicitly and shared through `Arc`
//! - **Fail-fast validation**: Configuration is validated when it is built
//! - **Thread-safe**: Clients and limiters are `Send + Sync`
//! - **Async-first**: Designed for use with the Tokio async runtime
//! - **No hidden retries**: Every request is attempted once

pub mod clients;
pub mod config;
pub mod error;
pub mod flowcontrol;

// Re-export public types at crate root for convenience
pub use config::{BaseUrl, ClientConfig, ClientConfigBuilder, ContentConfig, Transport};
pub use error::ConfigError;

// Re-export client types
pub use clients::{
    AdmissionCancelled, BuildError, DecodeError, ErrorKind, HttpMethod, Request, RestClient,
    RestError, RestInterface, RestResponse, SelectorError, ServerError, TransportError,
    TransportErrorKind,
};
