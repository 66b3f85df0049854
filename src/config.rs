//! Configuration management for NetSound Fetcher
//!
//! This module provides TOML configuration with multi-location lookup and
//! zero-config defaults. Every field has a default, so an empty file is a
//! valid configuration; command-line flags override whatever is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{
    AggregatorConfig, CatalogEndpoints, ClientConfig, FilterConstraints, FormatPreference,
    NamingPolicy, RetryPolicy, SearchPreset,
};
use crate::constants::{catalog, http, limits, logging, output, search};
use crate::errors::{ConfigError, ConfigResult};

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = "netsound-fetcher.toml";

/// Directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "netsound-fetcher";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Catalog endpoints
    pub catalog: CatalogConfigToml,
    /// Search and paging settings
    pub search: SearchConfigToml,
    /// File qualification settings
    pub filter: FilterConfigToml,
    /// Output list and ledger settings
    pub output: OutputConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
    /// Attempts per request, first try included
    pub max_attempts: u32,
    /// First retry delay in milliseconds
    pub retry_base_delay_ms: u64,
    /// Longest retry delay in milliseconds
    pub retry_max_delay_ms: u64,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            accept_invalid_certs: false,
            max_attempts: limits::MAX_ATTEMPTS,
            retry_base_delay_ms: limits::RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: limits::RETRY_MAX_DELAY_MS,
        }
    }
}

/// TOML-friendly catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfigToml {
    /// Full-text search endpoint
    pub search_url: String,
    /// Metadata endpoint
    pub metadata_url: String,
    /// Base path for download URLs
    pub download_base: String,
}

impl Default for CatalogConfigToml {
    fn default() -> Self {
        Self {
            search_url: catalog::SEARCH_URL.to_string(),
            metadata_url: catalog::METADATA_URL.to_string(),
            download_base: catalog::DOWNLOAD_BASE_URL.to_string(),
        }
    }
}

/// TOML-friendly search configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfigToml {
    /// Preset name: bbc, sfx, sitewide, raw
    pub preset: String,
    /// Number of URLs to collect
    pub count: usize,
    /// Rows per search page
    pub rows: u32,
    /// Page ceiling per tier
    pub max_pages: u32,
    /// Concurrent manifest requests
    pub concurrency: usize,
    /// Allow the broader fallback tier
    pub fallback: bool,
    /// Title tokens to exclude
    pub exclude: Vec<String>,
    /// Extra collections to exclude (primary tier)
    pub exclude_collections: Vec<String>,
    /// Subjects of which at least one is required (primary tier)
    pub include_subjects: Vec<String>,
}

impl Default for SearchConfigToml {
    fn default() -> Self {
        Self {
            preset: SearchPreset::Bbc.as_str().to_string(),
            count: search::DEFAULT_TARGET_COUNT,
            rows: search::DEFAULT_PAGE_SIZE,
            max_pages: search::DEFAULT_MAX_PAGES_PER_TIER,
            concurrency: search::DEFAULT_RESOLVE_CONCURRENCY,
            fallback: true,
            exclude: Vec::new(),
            exclude_collections: Vec::new(),
            include_subjects: Vec::new(),
        }
    }
}

/// TOML-friendly filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfigToml {
    /// Allowed extensions, also the format preference order
    pub formats: Vec<String>,
    /// Duration ceiling in seconds (0 = unlimited)
    pub max_duration_secs: f64,
    /// Size ceiling in megabytes (0 = unlimited)
    pub max_size_mb: f64,
    /// File name tokens to exclude
    pub exclude_names: Vec<String>,
}

impl Default for FilterConfigToml {
    fn default() -> Self {
        Self {
            formats: search::DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_duration_secs: 0.0,
            max_size_mb: 0.0,
            exclude_names: Vec::new(),
        }
    }
}

/// Output file naming mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// Zero-padded increasing number
    #[default]
    Progressive,
    /// Local timestamp
    Timestamp,
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Directory for generated lists
    pub out_dir: PathBuf,
    /// Dedup ledger file
    pub history: PathBuf,
    /// Skip URLs already in the ledger and append new ones
    pub dedupe: bool,
    /// File name prefix
    pub prefix: String,
    /// Digits of the progressive number
    pub width: usize,
    /// Naming mode
    pub naming: NamingMode,
    /// Fixed file mirroring the latest list
    pub latest: Option<PathBuf>,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(output::DEFAULT_OUT_DIR),
            history: PathBuf::from(output::DEFAULT_HISTORY_FILE),
            dedupe: false,
            prefix: output::DEFAULT_PREFIX.to_string(),
            width: output::DEFAULT_NUMBER_WIDTH,
            naming: NamingMode::Progressive,
            latest: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Explicit `--config` file (must exist)
    /// 2. `./netsound-fetcher.toml`
    /// 3. `<user config dir>/netsound-fetcher/config.toml`
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit file is missing or any file
    /// found cannot be read or parsed
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if path.exists() => Some(path),
            Some(path) => return Err(ConfigError::NotFound { path }),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Ok(user_path) = Self::default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the platform has no config directory
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_dir".to_string(),
            value: String::new(),
            reason: "could not determine user config directory".to_string(),
        })?;

        Ok(config_dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::InvalidFormat`
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Write the commented default configuration
    ///
    /// # Arguments
    ///
    /// * `path` - Target file, the user config path when `None`
    /// * `force` - Overwrite an existing file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyExists` when the file exists and `force`
    /// is false, or `ConfigError::Io` when writing fails
    pub async fn init(path: Option<PathBuf>, force: bool) -> ConfigResult<PathBuf> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        if config_path.exists() && !force {
            return Err(ConfigError::AlreadyExists { path: config_path });
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Effective configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if serialization fails
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        let formats = search::DEFAULT_EXTENSIONS
            .iter()
            .map(|e| format!("\"{}\"", e))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"# NetSound Fetcher Configuration
# Every setting is optional; command-line flags take precedence.

[client]
# HTTP client settings
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {pool_idle}
pool_max_per_host = {pool_max}
request_timeout_secs = {timeout}
connect_timeout_secs = {connect}
rate_limit_rps = {rps}
accept_invalid_certs = false  # Only for catalogs with broken certificates

# Retries for timeouts, connection errors, HTTP 429 and 5xx
max_attempts = {attempts}
retry_base_delay_ms = {base_delay}
retry_max_delay_ms = {max_delay}

[catalog]
search_url = "{search_url}"
metadata_url = "{metadata_url}"
download_base = "{download_base}"

[search]
preset = "bbc"  # bbc, sfx, sitewide, raw
count = {count}
rows = {rows}
max_pages = {max_pages}  # Page ceiling per tier
concurrency = {concurrency}  # Parallel manifest requests (1-{max_concurrency})
fallback = true  # Broaden the query when the scoped search runs dry
exclude = []  # Title tokens, e.g. ["radio", "podcast"]
exclude_collections = []
include_subjects = []

[filter]
formats = [{formats}]  # Allowed extensions, most preferred first
max_duration_secs = 0.0  # 0 = unlimited
max_size_mb = 0.0  # 0 = unlimited
exclude_names = []

[output]
out_dir = "{out_dir}"
history = "{history}"
dedupe = false
prefix = "{prefix}"
width = {width}
naming = "progressive"  # progressive, timestamp
# latest = "{out_dir}/envion_raw_latest.txt"

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            pool_idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            pool_max = http::POOL_MAX_PER_HOST,
            timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            attempts = limits::MAX_ATTEMPTS,
            base_delay = limits::RETRY_BASE_DELAY_MS,
            max_delay = limits::RETRY_MAX_DELAY_MS,
            search_url = catalog::SEARCH_URL,
            metadata_url = catalog::METADATA_URL,
            download_base = catalog::DOWNLOAD_BASE_URL,
            count = search::DEFAULT_TARGET_COUNT,
            rows = search::DEFAULT_PAGE_SIZE,
            max_pages = search::DEFAULT_MAX_PAGES_PER_TIER,
            concurrency = search::DEFAULT_RESOLVE_CONCURRENCY,
            max_concurrency = search::MAX_RESOLVE_CONCURRENCY,
            formats = formats,
            out_dir = output::DEFAULT_OUT_DIR,
            history = output::DEFAULT_HISTORY_FILE,
            prefix = output::DEFAULT_PREFIX,
            width = output::DEFAULT_NUMBER_WIDTH,
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let defaults = RetryPolicy::default();
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            user_agent: http::USER_AGENT.to_string(),
            accept_invalid_certs: self.accept_invalid_certs,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
                ..defaults
            },
        }
    }
}

impl CatalogConfigToml {
    /// Convert to runtime CatalogEndpoints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparseable URL
    pub fn to_runtime_config(&self) -> ConfigResult<CatalogEndpoints> {
        CatalogEndpoints::parse(&self.search_url, &self.metadata_url, &self.download_base)
    }
}

impl SearchConfigToml {
    /// Parse the configured preset name
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownPreset` for an unknown name
    pub fn preset(&self) -> ConfigResult<SearchPreset> {
        self.preset.parse()
    }

    /// Combine search and filter settings into a runtime AggregatorConfig
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownPreset` for an unknown preset name
    pub fn to_runtime_config(
        &self,
        filter: &FilterConfigToml,
        dedupe: bool,
    ) -> ConfigResult<AggregatorConfig> {
        let preset = self.preset()?;
        Ok(AggregatorConfig::default()
            .with_target_count(self.count)
            .with_page_size(self.rows)
            .with_max_pages(self.max_pages)
            .with_concurrency(self.concurrency)
            .with_fallback(self.fallback)
            .with_dedup(dedupe)
            .with_constraints(filter.to_runtime_config())
            .with_preference(FormatPreference::new(&filter.formats))
            .with_search_shape(preset.fields(), preset.sort()))
    }
}

impl FilterConfigToml {
    /// Convert to runtime FilterConstraints
    pub fn to_runtime_config(&self) -> FilterConstraints {
        FilterConstraints::new(&self.formats)
            .with_max_duration(positive(self.max_duration_secs))
            .with_max_size_bytes(positive(self.max_size_mb).map(|mb| mb * 1024.0 * 1024.0))
            .exclude_name_tokens(&self.exclude_names)
    }
}

impl OutputConfigToml {
    /// Naming policy for the output writer
    pub fn naming_policy(&self) -> NamingPolicy {
        match self.naming {
            NamingMode::Progressive => NamingPolicy::Progressive {
                prefix: self.prefix.clone(),
                width: self.width,
            },
            NamingMode::Timestamp => NamingPolicy::Timestamp {
                prefix: self.prefix.clone(),
            },
        }
    }
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}
