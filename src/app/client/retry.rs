//! Retry decorator for transient transport failures
//!
//! [`RetryingTransport`] wraps any [`HttpTransport`] and replays requests that
//! failed with a transient error (timeouts, connection failures, truncated
//! bodies, HTTP 429 and 5xx) using exponential backoff. Callers above this layer never retry.

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{HttpResponse, HttpTransport};
use crate::constants::limits;
use crate::errors::{TransportError, TransportResult};

/// Retry behaviour for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Growth factor between delays
    pub multiplier: f64,
    /// Randomization factor (0.0-1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(limits::RETRY_MAX_DELAY_MS),
            multiplier: limits::RETRY_MULTIPLIER,
            jitter: limits::RETRY_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Policy with negligible delays, for tests and local catalogs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Fresh backoff schedule for one request
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.jitter)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Transport decorator that retries transient failures
#[derive(Debug)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RetryingTransport<T> {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut schedule = self.policy.schedule();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.inner.get(url).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!("Request to {} succeeded on attempt {}", url, attempt);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = schedule.next_backoff().unwrap_or(self.policy.max_delay);
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    warn!("Request to {} failed after {} attempts: {}", url, attempt, e);
                    return Err(TransportError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
