//! Error types for NetSound Fetcher
//!
//! This module defines the error taxonomy for every stage of the curation
//! pipeline. Per-item and per-page errors are absorbed by the aggregator;
//! only [`AppError`] values reach the binary and decide the exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{exit, limits};

/// Raw HTTP transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying HTTP client error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Connection could not be established
    #[error("Connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Response body was cut off or could not be read
    #[error("Reading response body from {url} failed: {reason}")]
    Body { url: String, reason: String },

    /// Server returned a non-success status
    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Transient failures persisted through every attempt
    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// URL could not be built or parsed
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport could not be configured
    #[error("Invalid transport configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl TransportError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout { .. }
            | TransportError::Connect { .. }
            | TransportError::Body { .. } => true,
            TransportError::Status { status, .. } => {
                limits::TRANSIENT_STATUS_CODES.contains(status)
            }
            TransportError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_body()
                    || e
                        .status()
                        .map(|s| limits::TRANSIENT_STATUS_CODES.contains(&s.as_u16()))
                        .unwrap_or(false)
            }
            TransportError::RetriesExhausted { .. }
            | TransportError::InvalidUrl { .. }
            | TransportError::InvalidConfig { .. } => false,
        }
    }
}

/// Search endpoint errors; both variants abandon the current tier
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog could not be reached after retries
    #[error("Catalog unavailable: {source}")]
    Unavailable {
        #[source]
        source: TransportError,
    },

    /// Response body did not match the expected shape
    #[error("Malformed catalog response from {url}: {reason}")]
    Protocol { url: String, reason: String },

    /// Search parameters violate the request contract
    #[error("Invalid search request: {reason}")]
    InvalidRequest { reason: String },
}

/// Per-item manifest resolution errors; the item is skipped
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Manifest could not be fetched
    #[error("Manifest fetch failed for {identifier}: {source}")]
    Transport {
        identifier: String,
        #[source]
        source: TransportError,
    },

    /// Manifest body did not match the expected shape
    #[error("Malformed manifest for {identifier}: {reason}")]
    Malformed { identifier: String, reason: String },
}

/// Dedup ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Ledger file could not be read or appended
    #[error("Ledger I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output artifact errors; always fatal to the run
#[derive(Error, Debug)]
pub enum OutputError {
    /// Output directory could not be created
    #[error("Output directory not accessible: {path}")]
    DirectoryNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact could not be written
    #[error("Failed to write output file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No free file name could be found
    #[error("Could not find a free output file name in {dir}")]
    NamingExhausted { dir: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Unknown search preset name
    #[error("Unknown search preset: {name}. Expected one of: bbc, sfx, sitewide, raw")]
    UnknownPreset { name: String },

    /// Refusing to overwrite an existing file
    #[error("Configuration file already exists: {path}. Use --force to overwrite")]
    AlreadyExists { path: PathBuf },

    /// File I/O error
    #[error("Configuration I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport error outside the aggregator
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Catalog error outside the aggregator
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Resolution error outside the aggregator
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Output error
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Run finished without a single usable URL
    #[error("No usable audio files found for query '{query}'")]
    NoCandidatesFound { query: String },
}

impl AppError {
    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Transport(e) => e.is_transient(),
            AppError::Catalog(CatalogError::Unavailable { .. }) | AppError::Resolve(_) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "transport",
            AppError::Catalog(_) => "catalog",
            AppError::Resolve(_) => "resolve",
            AppError::Ledger(_) => "ledger",
            AppError::Output(_) => "output",
            AppError::Config(_) => "config",
            AppError::NoCandidatesFound { .. } => "no_results",
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NoCandidatesFound { .. } => exit::NO_RESULTS,
            _ => exit::FAILURE,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Resolve result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Ledger result type alias
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Output result type alias
pub type OutputResult<T> = std::result::Result<T, OutputError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = TransportError::Status {
            url: "https://example.org".to_string(),
            status: 429,
        };
        let not_found = TransportError::Status {
            url: "https://example.org".to_string(),
            status: 404,
        };
        let timeout = TransportError::Timeout {
            url: "https://example.org".to_string(),
        };

        assert!(rate_limited.is_transient());
        assert!(!not_found.is_transient());
        assert!(timeout.is_transient());

        let truncated = TransportError::Body {
            url: "https://example.org".to_string(),
            reason: "unexpected end of file".to_string(),
        };
        assert!(truncated.is_transient());
    }

    #[test]
    fn test_exit_codes() {
        let none = AppError::NoCandidatesFound {
            query: "wind".to_string(),
        };
        assert_eq!(none.exit_code(), exit::NO_RESULTS);
        assert_eq!(none.category(), "no_results");

        let output = AppError::Output(OutputError::NamingExhausted {
            dir: PathBuf::from("/tmp"),
        });
        assert_eq!(output.exit_code(), exit::FAILURE);
        assert!(!output.is_recoverable());
    }

    #[test]
    fn test_catalog_unavailable_is_recoverable() {
        let error = AppError::Catalog(CatalogError::Unavailable {
            source: TransportError::RetriesExhausted {
                url: "https://example.org".to_string(),
                attempts: 5,
                last_error: "HTTP 503".to_string(),
            },
        });
        assert!(error.is_recoverable());
        assert_eq!(error.category(), "catalog");
    }
}
