//! Admission control for outgoing requests.
//!
//! A [`RateLimiter`] decides when a request may be dispatched. Every
//! [`Request`](crate::Request) created by the same
//! [`RestClient`](crate::RestClient) asks the same limiter for admission, so
//! the limiter bounds the combined throughput of all concurrent callers.
//!
//! The module ships one implementation, [`TokenBucketRateLimiter`], and the
//! trait is object safe so callers can plug in their own limiter and share it
//! across several clients.
//!
//! # Example
//!
//! ```rust
//! use harbor_rest::flowcontrol::{RateLimiter, TokenBucketRateLimiter};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! // 5 requests per second, bursts of up to 10
//! let limiter = TokenBucketRateLimiter::new(5.0, 10).unwrap();
//!
//! if !limiter.try_accept() {
//!     limiter.wait(&CancellationToken::new()).await.unwrap();
//! }
//! # }
//! ```

mod token_bucket;

pub use token_bucket::TokenBucketRateLimiter;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Returned when a wait for admission was cancelled before a token became
/// available. A cancelled wait never consumes a token.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("request was cancelled while waiting for rate limiter admission")]
pub struct AdmissionCancelled;

/// Admits calls at a sustained rate.
///
/// Implementations must be safe to share between many concurrent callers.
#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Takes a token if one is available right now. Never blocks.
    fn try_accept(&self) -> bool;

    /// Waits until a token is available and takes it.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionCancelled`] if `cancel` fires first. No token is
    /// taken in that case.
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), AdmissionCancelled>;

    /// The sustained rate in tokens per second.
    fn qps(&self) -> f32;
}
