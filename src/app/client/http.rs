//! Core HTTP operations with rate limiting
//!
//! This module provides the reqwest-backed transport. It applies a
//! client-wide rate limit and maps reqwest failures onto [`TransportError`]
//! so the retry layer can tell transient failures from permanent ones.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::Client;
use url::Url;

use super::config::ClientConfig;
use super::{HttpResponse, HttpTransport};
use crate::errors::{TransportError, TransportResult};

/// Transport performing real HTTP requests through reqwest
#[derive(Debug)]
pub struct ReqwestTransport {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl ReqwestTransport {
    /// Creates a new transport from client configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the client cannot be built or the rate
    /// limit is zero
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> TransportResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            TransportError::InvalidConfig {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Map a reqwest failure onto the transport taxonomy
    fn classify(url: &Url, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            TransportError::Body {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else {
            TransportError::Http(error)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        // Apply rate limiting with jitter to avoid thundering herd
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::classify(url, e))?;
        tracing::debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(HttpResponse {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = ReqwestTransport::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        let result = ReqwestTransport::build_rate_limiter(0);
        assert!(matches!(result, Err(TransportError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_get_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/hello", server.uri())).unwrap();
        let response = transport.get(&url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/busy", server.uri())).unwrap();
        let error = transport.get(&url).await.unwrap_err();

        assert!(matches!(error, TransportError::Status { status: 503, .. }));
        assert!(error.is_transient());
    }
}
