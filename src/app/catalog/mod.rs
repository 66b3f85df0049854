//! Catalog access: paginated search and per-item manifests
//!
//! The catalog exposes two collaborating endpoints. [`CatalogClient`] pages
//! through the full-text search endpoint and yields [`CatalogItem`]s;
//! [`ManifestResolver`] turns one identifier into its file manifest. Both go
//! through the shared [`HttpTransport`], so retries happen below this layer.
//!
//! [`CatalogItem`]: crate::app::models::CatalogItem
//! [`HttpTransport`]: crate::app::client::HttpTransport

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::catalog;
use crate::errors::{ConfigError, ConfigResult};

pub mod manifest;
pub mod search;

pub use manifest::{parse_duration, ManifestResolver};
pub use search::{CatalogClient, SearchPage};

/// Base URLs of the catalog service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoints {
    /// Full-text search endpoint
    pub search_url: Url,
    /// Metadata endpoint, the identifier is appended as a path segment
    pub metadata_url: Url,
    /// Base path joined with identifier and file name to form download URLs
    pub download_base: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            search_url: Url::parse(catalog::SEARCH_URL).expect("Search URL should be valid"),
            metadata_url: Url::parse(catalog::METADATA_URL)
                .expect("Metadata URL should be valid"),
            download_base: catalog::DOWNLOAD_BASE_URL.to_string(),
        }
    }
}

impl CatalogEndpoints {
    /// Build endpoints from user-supplied strings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if either endpoint is not an absolute URL
    pub fn parse(search_url: &str, metadata_url: &str, download_base: &str) -> ConfigResult<Self> {
        Ok(Self {
            search_url: parse_endpoint("catalog.search_url", search_url)?,
            metadata_url: parse_endpoint("catalog.metadata_url", metadata_url)?,
            download_base: parse_endpoint("catalog.download_base", download_base)
                .map(|_| download_base.trim_end_matches('/').to_string())?,
        })
    }

    /// Endpoints rooted at a single base URL, as used by local catalog mirrors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `base` is not an absolute URL
    pub fn rooted_at(base: &str) -> ConfigResult<Self> {
        let base = base.trim_end_matches('/');
        Self::parse(
            &format!("{}/advancedsearch.php", base),
            &format!("{}/metadata", base),
            &format!("{}/download", base),
        )
    }
}

fn parse_endpoint(field: &str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
