//! Paginated catalog search
//!
//! Each call is independent given `(query, page)`: paging is offset-based and
//! needs no server-side cursor, so a tier can be resumed at any page.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::client::HttpTransport;
use crate::app::models::CatalogItem;
use crate::constants::catalog;
use crate::errors::{CatalogError, CatalogResult};

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Items in catalog order
    pub items: Vec<CatalogItem>,
    /// Whether another page may hold more results
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound", default)]
    num_found: Option<u64>,
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    title: Option<OneOrMany>,
    #[serde(default)]
    collection: Option<OneOrMany>,
}

/// Catalog fields that are sometimes a string and sometimes a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn first(self) -> Option<String> {
        match self {
            OneOrMany::One(s) => Some(s),
            OneOrMany::Many(v) => v.into_iter().next(),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Client for the catalog's full-text search endpoint
#[derive(Debug, Clone)]
pub struct CatalogClient {
    transport: Arc<dyn HttpTransport>,
    search_url: Url,
    fields: Vec<String>,
    sort: Vec<String>,
}

impl CatalogClient {
    /// Create a client requesting the default field list
    pub fn new(transport: Arc<dyn HttpTransport>, search_url: Url) -> Self {
        Self {
            transport,
            search_url,
            fields: catalog::DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            sort: Vec::new(),
        }
    }

    /// Replace the requested field list (`identifier` is always requested)
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        if !self.fields.iter().any(|f| f == "identifier") {
            self.fields.insert(0, "identifier".to_string());
        }
        self
    }

    /// Replace the sort clauses
    pub fn with_sort(mut self, sort: Vec<String>) -> Self {
        self.sort = sort;
        self
    }

    /// Build the request URL for one page
    pub fn page_url(&self, query: &str, page_size: u32, page: u32) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("rows", &page_size.to_string())
                .append_pair("page", &page.to_string())
                .append_pair("output", "json");
            for field in &self.fields {
                pairs.append_pair("fl[]", field);
            }
            for sort in &self.sort {
                pairs.append_pair("sort[]", sort);
            }
        }
        url
    }

    /// Fetch one page of results
    ///
    /// # Arguments
    ///
    /// * `query` - Expression in the catalog's query language
    /// * `page_size` - Rows per page, must be positive
    /// * `page` - 1-based page number
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidRequest` for a zero page size or page,
    /// `CatalogError::Unavailable` when the transport gives up, and
    /// `CatalogError::Protocol` when the body is not a search response
    pub async fn search(&self, query: &str, page_size: u32, page: u32) -> CatalogResult<SearchPage> {
        if page_size == 0 {
            return Err(CatalogError::InvalidRequest {
                reason: "page size must be greater than zero".to_string(),
            });
        }
        if page == 0 {
            return Err(CatalogError::InvalidRequest {
                reason: "page numbers start at 1".to_string(),
            });
        }

        let url = self.page_url(query, page_size, page);
        debug!("Searching catalog: {}", url);

        let response = self
            .transport
            .get(&url)
            .await
            .map_err(|source| CatalogError::Unavailable { source })?;

        let envelope: SearchEnvelope =
            response.json().map_err(|e| CatalogError::Protocol {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let returned = envelope.response.docs.len();
        let has_more = returned > 0
            && match envelope.response.num_found {
                Some(total) => u64::from(page) * u64::from(page_size) < total,
                None => returned >= page_size as usize,
            };

        let items: Vec<CatalogItem> = envelope
            .response
            .docs
            .into_iter()
            .filter_map(|doc| {
                let identifier = doc.identifier.filter(|id| !id.trim().is_empty());
                if identifier.is_none() {
                    debug!("Skipping search hit without identifier");
                }
                let identifier = identifier?;
                Some(CatalogItem {
                    identifier,
                    title: doc.title.and_then(OneOrMany::first).unwrap_or_default(),
                    source_tags: doc
                        .collection
                        .map(OneOrMany::into_vec)
                        .unwrap_or_default()
                        .into_iter()
                        .collect::<BTreeSet<_>>(),
                })
            })
            .collect();

        debug!(
            "Page {} returned {} items (has_more = {})",
            page,
            items.len(),
            has_more
        );

        Ok(SearchPage { items, has_more })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{ClientConfig, ReqwestTransport};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CatalogClient {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/advancedsearch.php", server.uri())).unwrap();
        CatalogClient::new(Arc::new(transport), url)
    }

    #[test]
    fn test_page_url_repeats_field_keys() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let client = CatalogClient::new(
            Arc::new(transport),
            Url::parse("https://catalog.test/advancedsearch.php").unwrap(),
        )
        .with_fields(vec!["title".to_string()])
        .with_sort(vec!["downloads desc".to_string()]);

        let url = client.page_url("text:(wind rain)", 50, 2);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("q".to_string(), "text:(wind rain)".to_string())));
        assert!(pairs.contains(&("rows".to_string(), "50".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("output".to_string(), "json".to_string())));
        assert!(pairs.contains(&("fl[]".to_string(), "identifier".to_string())));
        assert!(pairs.contains(&("fl[]".to_string(), "title".to_string())));
        assert!(pairs.contains(&("sort[]".to_string(), "downloads desc".to_string())));
    }

    #[tokio::test]
    async fn test_search_parses_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/advancedsearch.php"))
            .and(query_param("q", "text:wind"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "numFound": 3,
                    "docs": [
                        {"identifier": "wind-1", "title": "Wind One", "collection": ["sfx", "bbc"]},
                        {"identifier": "wind-2", "title": ["Wind Two", "alt"], "collection": "sfx"},
                        {"title": "no identifier"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).search("text:wind", 3, 1).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].identifier, "wind-1");
        assert!(page.items[0].source_tags.contains("bbc"));
        assert_eq!(page.items[1].title, "Wind Two");
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_has_more_from_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 10, "docs": [{"identifier": "a"}, {"identifier": "b"}]}
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).search("*:*", 2, 1).await.unwrap();
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_empty_page_has_no_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 10, "docs": []}
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).search("*:*", 2, 9).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).search("*:*", 10, 1).await;
        assert!(matches!(result, Err(CatalogError::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).search("*:*", 10, 1).await;
        assert!(matches!(result, Err(CatalogError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_invalid_paging_rejected() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        assert!(matches!(
            client.search("*:*", 0, 1).await,
            Err(CatalogError::InvalidRequest { .. })
        ));
        assert!(matches!(
            client.search("*:*", 10, 0).await,
            Err(CatalogError::InvalidRequest { .. })
        ));
    }
}
