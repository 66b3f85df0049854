//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of HTTP clients
//! used against catalog search and metadata endpoints. TLS verification is a
//! per-client setting carried here, never process-wide state.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::retry::RetryPolicy;
use crate::constants::{http, limits};
use crate::errors::TransportResult;

/// Configuration for the catalog HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout, applied to every outbound call
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// User agent sent with every request
    pub user_agent: String,
    /// Skip TLS certificate verification for this client only
    pub accept_invalid_certs: bool,
    /// Retry behaviour for transient failures
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            user_agent: http::USER_AGENT.to_string(),
            accept_invalid_certs: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Disable certificate verification for this client
    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.accept_invalid_certs = insecure;
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> TransportResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        // Configure TCP keep-alive if specified
        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        if self.accept_invalid_certs {
            warn!("TLS certificate verification disabled for catalog client");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        Ok(client_builder.build()?)
    }
}
