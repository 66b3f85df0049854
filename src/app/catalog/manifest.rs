//! Per-item file manifests
//!
//! The metadata endpoint lists the concrete files of one catalog item. Duration
//! and size metadata are loosely typed upstream (numbers, numeric strings, or
//! clock notation), so every value is parsed leniently: anything unparseable
//! becomes "unknown" rather than an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::app::client::HttpTransport;
use crate::app::models::FileManifestEntry;
use crate::errors::{ResolveError, ResolveResult, TransportError};

#[derive(Debug, Deserialize)]
struct ManifestBody {
    files: Option<Vec<RawFile>>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    length: Option<Value>,
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default)]
    size: Option<Value>,
}

impl RawFile {
    fn into_entry(self) -> Option<FileManifestEntry> {
        let name = self.name.filter(|n| !n.is_empty())?;
        let duration_seconds = self
            .length
            .as_ref()
            .and_then(duration_from_value)
            .or_else(|| self.duration.as_ref().and_then(duration_from_value));
        Some(FileManifestEntry {
            name,
            format_hint: self.format.unwrap_or_default(),
            duration_seconds,
            size_bytes: self.size.as_ref().and_then(size_from_value),
        })
    }
}

/// Resolves catalog identifiers into their file manifests
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    transport: Arc<dyn HttpTransport>,
    metadata_url: Url,
}

impl ManifestResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, metadata_url: Url) -> Self {
        Self {
            transport,
            metadata_url,
        }
    }

    /// Metadata URL for one identifier
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` if the metadata URL cannot take
    /// path segments
    pub fn manifest_url(&self, identifier: &str) -> Result<Url, TransportError> {
        let mut url = self.metadata_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl {
                url: self.metadata_url.to_string(),
                reason: "metadata URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(identifier);
        Ok(url)
    }

    /// Fetch the manifest of one item
    ///
    /// An item with no usable files yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Transport` when the metadata request fails and
    /// `ResolveError::Malformed` when the body has no file list
    pub async fn resolve(&self, identifier: &str) -> ResolveResult<Vec<FileManifestEntry>> {
        let url = self
            .manifest_url(identifier)
            .map_err(|source| ResolveError::Transport {
                identifier: identifier.to_string(),
                source,
            })?;

        let response = self
            .transport
            .get(&url)
            .await
            .map_err(|source| ResolveError::Transport {
                identifier: identifier.to_string(),
                source,
            })?;

        let body: ManifestBody = response.json().map_err(|e| ResolveError::Malformed {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;

        let files = body.files.ok_or_else(|| ResolveError::Malformed {
            identifier: identifier.to_string(),
            reason: "response has no file list".to_string(),
        })?;

        let entries: Vec<FileManifestEntry> =
            files.into_iter().filter_map(RawFile::into_entry).collect();
        debug!("Resolved {} files for {}", entries.len(), identifier);
        Ok(entries)
    }
}

/// Parse a duration given as seconds or clock notation
///
/// Accepts `"90"`, `"90.5"`, `"1:30"`, `"01:02:03.25"`. Out-of-range clock
/// fields still add up. Returns `None` for anything else, including negative
/// values.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if !raw.contains(':') {
        return finite_non_negative(raw.parse::<f64>().ok()?);
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let (whole, last) = parts.split_at(parts.len() - 1);
    let mut total = 0.0;
    for part in whole {
        let value: u64 = part.trim().parse().ok()?;
        total = total * 60.0 + value as f64;
    }
    // Fields are summed without range checks, so "1:75" is 135 seconds
    let seconds = finite_non_negative(last[0].trim().parse::<f64>().ok()?)?;
    Some(total * 60.0 + seconds)
}

fn finite_non_negative(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn duration_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite_non_negative),
        Value::String(s) => parse_duration(s),
        _ => None,
    }
}

fn size_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{ClientConfig, ReqwestTransport};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> ManifestResolver {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/metadata", server.uri())).unwrap();
        ManifestResolver::new(Arc::new(transport), url)
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("90"), Some(90.0));
        assert_eq!(parse_duration(" 12.5 "), Some(12.5));
        assert_eq!(parse_duration("1:30"), Some(90.0));
        assert_eq!(parse_duration("01:02:03"), Some(3723.0));
        assert_eq!(parse_duration("0:05.25"), Some(5.25));
    }

    #[test]
    fn test_parse_duration_overflowing_fields_add_up() {
        assert_eq!(parse_duration("1:75"), Some(135.0));
        assert_eq!(parse_duration("1:75:00"), Some(8100.0));
        assert_eq!(parse_duration("0:90.5"), Some(90.5));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("-3"), None);
        assert_eq!(parse_duration("1:x"), None);
    }

    #[test]
    fn test_manifest_url_appends_identifier() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let resolver = ManifestResolver::new(
            Arc::new(transport),
            Url::parse("https://catalog.test/metadata/").unwrap(),
        );
        let url = resolver.manifest_url("wind item").unwrap();
        assert_eq!(url.as_str(), "https://catalog.test/metadata/wind%20item");
    }

    #[tokio::test]
    async fn test_resolve_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metadata/wind-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"name": "wind.mp3", "format": "VBR MP3", "length": "1:30", "size": "2048"},
                    {"name": "wind.flac", "format": "Flac", "length": 42.5, "size": 4096},
                    {"name": "wind.ogg", "duration": "12"},
                    {"name": "notes.txt", "length": "n/a"},
                    {"format": "Metadata"}
                ]
            })))
            .mount(&server)
            .await;

        let entries = resolver_for(&server).resolve("wind-1").await.unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].duration_seconds, Some(90.0));
        assert_eq!(entries[0].size_bytes, Some(2048));
        assert_eq!(entries[0].format_hint, "VBR MP3");
        assert_eq!(entries[1].duration_seconds, Some(42.5));
        assert_eq!(entries[2].duration_seconds, Some(12.0));
        assert_eq!(entries[3].duration_seconds, None);
    }

    #[tokio::test]
    async fn test_missing_file_list_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let result = resolver_for(&server).resolve("ghost").await;
        assert!(matches!(result, Err(ResolveError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure_names_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        match resolver_for(&server).resolve("gone").await {
            Err(ResolveError::Transport { identifier, .. }) => assert_eq!(identifier, "gone"),
            other => panic!("Expected transport error, got {:?}", other),
        }
    }
}
