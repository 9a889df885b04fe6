//! Integration tests for admission control.
//!
//! These tests verify the token bucket's burst and sustained-rate behavior
//! through the public API and that custom limiters plug into the client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use harbor_rest::flowcontrol::{AdmissionCancelled, RateLimiter, TokenBucketRateLimiter};
use harbor_rest::{ClientConfig, ConfigError, ErrorKind, RestClient};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A limiter that admits everything and counts admissions.
#[derive(Debug, Default)]
struct CountingLimiter {
    admitted: AtomicUsize,
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    fn try_accept(&self) -> bool {
        self.admitted.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), AdmissionCancelled> {
        if cancel.is_cancelled() {
            return Err(AdmissionCancelled);
        }
        self.admitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn qps(&self) -> f32 {
        f32::INFINITY
    }
}

/// A limiter that never admits anything.
#[derive(Debug)]
struct ClosedLimiter;

#[async_trait]
impl RateLimiter for ClosedLimiter {
    fn try_accept(&self) -> bool {
        false
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), AdmissionCancelled> {
        cancel.cancelled().await;
        Err(AdmissionCancelled)
    }

    fn qps(&self) -> f32 {
        0.0
    }
}

// ============================================================================
// Token Bucket Behavior
// ============================================================================

#[test]
fn test_invalid_qps_is_config_error() {
    let error = TokenBucketRateLimiter::new(0.0, 10).unwrap_err();
    assert!(matches!(error, ConfigError::InvalidRateLimit { .. }));
    assert!(error.to_string().contains("qps"));
}

#[tokio::test]
async fn test_burst_then_refuse_then_refill() {
    let limiter = TokenBucketRateLimiter::new(20.0, 4).unwrap();

    for _ in 0..4 {
        assert!(limiter.try_accept());
    }
    assert!(!limiter.try_accept());

    // B / R = 200ms
    tokio::time::sleep(Duration::from_millis(250)).await;
    for _ in 0..4 {
        assert!(limiter.try_accept());
    }
    assert!(!limiter.try_accept());
}

#[tokio::test]
async fn test_sustained_rate_across_tasks() {
    let limiter = Arc::new(TokenBucketRateLimiter::new(40.0, 4).unwrap());
    let started = Instant::now();

    let handles: Vec<_> = (0..24)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                limiter.wait(&cancel).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // (N - B) / R = 20 / 40 = 500ms
    assert!(started.elapsed() >= Duration::from_millis(450));
}

// ============================================================================
// Custom Limiters
// ============================================================================

#[tokio::test]
async fn test_custom_limiter_is_consulted_once_per_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let limiter = Arc::new(CountingLimiter::default());
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .rate_limiter(Arc::clone(&limiter) as Arc<dyn RateLimiter>)
        .build()
        .unwrap();
    let client = RestClient::new(config).unwrap();

    for _ in 0..3 {
        client.get().path("ping").send().await.unwrap();
    }

    // Build errors are reported before admission.
    let _ = client.get().segment("").send().await.unwrap_err();

    assert_eq!(limiter.admitted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_closed_limiter_blocks_until_cancelled() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .rate_limiter(Arc::new(ClosedLimiter))
        .build()
        .unwrap();
    let client = RestClient::new(config).unwrap();

    let cancel = CancellationToken::new();
    let request = client.get().path("ping").with_cancellation(cancel.clone());
    let pending = tokio::spawn(request.send());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    cancel.cancel();
    let error = pending.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AdmissionCancelled);
}
