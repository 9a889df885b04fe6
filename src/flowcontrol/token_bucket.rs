//! Token bucket rate limiter.
//!
//! Tokens accrue continuously at `qps` tokens per second up to `burst`.
//! Refill is computed lazily on every access as
//! `min(burst, tokens + elapsed * qps)`, so there are no background timers.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::{AdmissionCancelled, RateLimiter};
use crate::error::ConfigError;

/// Bucket state. Guarded by a mutex that is never held across an await.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, qps: f64, burst: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = elapsed.as_secs_f64().mul_add(qps, self.tokens).min(burst);
        self.last_refill = now;
    }

    fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until one whole token is available. Saturates at
    /// [`Duration::MAX`] for rates too slow to express.
    fn time_to_next_token(&self, qps: f64) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::try_from_secs_f64(missing / qps).unwrap_or(Duration::MAX)
    }
}

/// A token bucket rate limiter.
///
/// The bucket starts full, so up to `burst` calls are admitted immediately.
/// After that calls are admitted at `qps` per second.
///
/// Blocking waiters are served in arrival order: they queue on a fair async
/// mutex and only the waiter at the head of the queue sleeps for the next
/// token. [`try_accept`](RateLimiter::try_accept) does not queue.
///
/// # Example
///
/// ```rust
/// use harbor_rest::flowcontrol::{RateLimiter, TokenBucketRateLimiter};
///
/// let limiter = TokenBucketRateLimiter::new(1.0, 3).unwrap();
///
/// assert!(limiter.try_accept());
/// assert!(limiter.try_accept());
/// assert!(limiter.try_accept());
/// assert!(!limiter.try_accept());
/// ```
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    qps: f32,
    burst: u32,
    bucket: Mutex<Bucket>,
    waiters: tokio::sync::Mutex<()>,
}

impl TokenBucketRateLimiter {
    /// Creates a limiter admitting `qps` calls per second with bursts of up
    /// to `burst` calls. A `burst` of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRateLimit`] if `qps` is not a positive,
    /// finite number.
    pub fn new(qps: f32, burst: u32) -> Result<Self, ConfigError> {
        if !qps.is_finite() || qps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit {
                reason: format!("token bucket qps must be positive and finite, got {qps}"),
            });
        }
        let burst = burst.max(1);

        Ok(Self {
            qps,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
            waiters: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns the bucket capacity.
    #[must_use]
    pub const fn burst(&self) -> u32 {
        self.burst
    }

    /// Returns the number of tokens currently banked, after refill.
    #[must_use]
    pub fn tokens(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket);
        bucket.tokens
    }

    fn lock_bucket(&self) -> MutexGuard<'_, Bucket> {
        // The bucket is consistent after every statement, so a panic in
        // another holder cannot leave it half-updated.
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refill(&self, bucket: &mut Bucket) {
        bucket.refill(Instant::now(), f64::from(self.qps), f64::from(self.burst));
    }

    /// Takes a token or returns how long until the next one accrues.
    fn take_or_delay(&self) -> Result<(), Duration> {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket);
        if bucket.try_take() {
            Ok(())
        } else {
            Err(bucket.time_to_next_token(f64::from(self.qps)))
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    fn try_accept(&self) -> bool {
        self.take_or_delay().is_ok()
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), AdmissionCancelled> {
        if cancel.is_cancelled() {
            return Err(AdmissionCancelled);
        }

        let _turn = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AdmissionCancelled),
            turn = self.waiters.lock() => turn,
        };

        loop {
            let delay = match self.take_or_delay() {
                Ok(()) => return Ok(()),
                Err(delay) => delay,
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AdmissionCancelled),
                () = sleep(delay) => {}
            }
        }
    }

    fn qps(&self) -> f32 {
        self.qps
    }
}
