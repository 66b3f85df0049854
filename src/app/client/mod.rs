//! HTTP transport for catalog access
//!
//! Every outbound request goes through the [`HttpTransport`] trait so the
//! catalog and manifest layers can be exercised against scripted fakes.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: reqwest-backed transport with rate limiting
//! - `retry`: exponential-backoff decorator for transient failures

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::TransportResult;

pub mod config;
pub mod http;
pub mod retry;

pub use config::ClientConfig;
pub use http::ReqwestTransport;
pub use retry::{RetryPolicy, RetryingTransport};

/// A successful HTTP response with its body read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// URL the response was fetched from
    pub url: String,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Seam for issuing GET requests
///
/// Implementations return `Err(TransportError::Status)` for non-2xx responses.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        (**self).get(url).await
    }
}

/// Build the production transport: reqwest with rate limiting, wrapped in retries
///
/// # Errors
///
/// Returns `TransportError` if the HTTP client cannot be constructed
pub fn build_transport(config: &ClientConfig) -> TransportResult<Arc<dyn HttpTransport>> {
    let transport = ReqwestTransport::new(config)?;
    tracing::debug!(
        "Built catalog transport (rate limit {} rps, {} attempts)",
        config.rate_limit_rps,
        config.retry.max_attempts
    );
    Ok(Arc::new(RetryingTransport::new(
        transport,
        config.retry.clone(),
    )))
}
