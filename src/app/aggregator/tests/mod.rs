//! Unit tests for the aggregator state machine
//!
//! These tests run the aggregator against an in-memory catalog so paging,
//! tier fallback and accumulation can be checked without a network.
//! End-to-end scenarios over real HTTP live in the top-level tests directory.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::app::client::{HttpResponse, HttpTransport};
use crate::app::query::SearchPreset;
use crate::errors::{TransportError, TransportResult};

use super::*;

const BASE: &str = "https://catalog.test";

/// In-memory catalog answering search and metadata requests
#[derive(Debug, Default)]
struct FakeCatalog {
    /// query -> pages of identifiers
    pages: HashMap<String, Vec<Vec<String>>>,
    /// queries that always fail with HTTP 503
    failing: HashSet<String>,
    /// identifier -> manifest body
    manifests: HashMap<String, Value>,
    /// identifier whose manifest request triggers a shutdown
    cancel_on: Option<(String, broadcast::Sender<()>)>,
    search_calls: AtomicUsize,
    manifest_calls: AtomicUsize,
}

impl FakeCatalog {
    fn with_pages(mut self, query: &str, pages: &[&[&str]]) -> Self {
        self.pages.insert(
            query.to_string(),
            pages
                .iter()
                .map(|page| page.iter().map(|id| id.to_string()).collect())
                .collect(),
        );
        self
    }

    fn with_failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    fn with_manifest(mut self, identifier: &str, files: &[(&str, Option<&str>)]) -> Self {
        let files: Vec<Value> = files
            .iter()
            .map(|(name, length)| match length {
                Some(length) => json!({"name": name, "length": length}),
                None => json!({"name": name}),
            })
            .collect();
        self.manifests
            .insert(identifier.to_string(), json!({ "files": files }));
        self
    }

    fn cancelling_on(mut self, identifier: &str, shutdown_tx: broadcast::Sender<()>) -> Self {
        self.cancel_on = Some((identifier.to_string(), shutdown_tx));
        self
    }

    fn respond(url: &Url, body: Value) -> TransportResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            url: url.to_string(),
            body: body.to_string(),
        })
    }

    fn not_found(url: &Url, status: u16) -> TransportResult<HttpResponse> {
        Err(TransportError::Status {
            url: url.to_string(),
            status,
        })
    }
}

#[async_trait]
impl HttpTransport for FakeCatalog {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        if url.path().ends_with("/advancedsearch.php") {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let query = params.get("q").cloned().unwrap_or_default();
            let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

            if self.failing.contains(&query) {
                return Self::not_found(url, 503);
            }

            let pages = self.pages.get(&query).cloned().unwrap_or_default();
            let total: usize = pages.iter().map(Vec::len).sum();
            let docs: Vec<Value> = pages
                .get(page - 1)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|id| json!({"identifier": id, "title": id}))
                .collect();
            return Self::respond(url, json!({"response": {"numFound": total, "docs": docs}}));
        }

        if let Some(identifier) = url.path().strip_prefix("/metadata/") {
            self.manifest_calls.fetch_add(1, Ordering::SeqCst);
            if let Some((trigger, shutdown_tx)) = &self.cancel_on {
                if trigger == identifier {
                    let _ = shutdown_tx.send(());
                }
            }
            return match self.manifests.get(identifier) {
                Some(body) => Self::respond(url, body.clone()),
                None => Self::not_found(url, 404),
            };
        }

        Self::not_found(url, 404)
    }
}

fn endpoints() -> CatalogEndpoints {
    CatalogEndpoints::rooted_at(BASE).unwrap()
}

fn download(identifier: &str, name: &str) -> String {
    format!("{}/download/{}/{}", BASE, identifier, name)
}

fn sitewide_query() -> QueryBuilder {
    QueryBuilder::new("wind")
}

fn bbc_query() -> QueryBuilder {
    QueryBuilder::from_preset("wind", SearchPreset::Bbc)
}

fn build(
    config: AggregatorConfig,
    catalog: &Arc<FakeCatalog>,
    query: QueryBuilder,
) -> Aggregator {
    let transport: Arc<dyn HttpTransport> = catalog.clone();
    Aggregator::new(config, transport, &endpoints(), query).unwrap()
}

fn urls(outcome: &RunOutcome) -> Vec<String> {
    outcome.batch.urls().map(str::to_string).collect()
}

/// Test that the run stops as soon as the target is reached
///
/// With sequential resolution no manifest beyond the third is requested.
#[tokio::test]
async fn test_stops_at_target() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a", "b", "c", "d", "e"]])
            .with_manifest("a", &[("a.mp3", None)])
            .with_manifest("b", &[("b.mp3", None)])
            .with_manifest("c", &[("c.mp3", None)])
            .with_manifest("d", &[("d.mp3", None)])
            .with_manifest("e", &[("e.mp3", None)]),
    );

    let config = AggregatorConfig::default()
        .with_target_count(3)
        .with_concurrency(1);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(outcome.status, RunStatus::Done);
    assert!(!outcome.is_short());
    assert_eq!(
        urls(&outcome),
        vec![download("a", "a.mp3"), download("b", "b.mp3"), download("c", "c.mp3")]
    );
    assert_eq!(catalog.manifest_calls.load(Ordering::SeqCst), 3);
}

/// Test catalog order across items and rank order within an item
#[tokio::test]
async fn test_catalog_then_rank_order() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["first", "second"]])
            .with_manifest(
                "first",
                &[
                    ("long.wav", Some("10")),
                    ("unknown.mp3", None),
                    ("short.mp3", Some("0:05")),
                    ("cover.jpg", None),
                ],
            )
            .with_manifest("second", &[("x.ogg", Some("3"))]),
    );

    let config = AggregatorConfig::default().with_target_count(10);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert!(outcome.is_short());
    assert_eq!(
        urls(&outcome),
        vec![
            download("first", "short.mp3"),
            download("first", "unknown.mp3"),
            download("first", "long.wav"),
            download("second", "x.ogg"),
        ]
    );
    assert_eq!(outcome.stats.entries_rejected, 1);
}

/// Test that ledger hits are skipped only when dedup is enabled
#[tokio::test]
async fn test_ledger_dedup() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a", "b"]])
            .with_manifest("a", &[("a.mp3", None)])
            .with_manifest("b", &[("b.mp3", None)]),
    );
    let ledger: LedgerSnapshot = [format!("{};", download("a", "a.mp3"))].into_iter().collect();

    let deduped = build(
        AggregatorConfig::default().with_target_count(2).with_dedup(true),
        &catalog,
        query.clone(),
    )
    .with_ledger(ledger.clone())
    .run()
    .await;
    assert_eq!(urls(&deduped), vec![download("b", "b.mp3")]);
    assert_eq!(deduped.stats.ledger_hits, 1);

    let plain = build(AggregatorConfig::default().with_target_count(2), &catalog, query)
        .with_ledger(ledger)
        .run()
        .await;
    assert_eq!(plain.batch.len(), 2);
    assert_eq!(plain.stats.ledger_hits, 0);
}

/// Test that a failing manifest skips only its own item
#[tokio::test]
async fn test_failed_item_is_skipped() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["broken", "good"]])
            .with_manifest("good", &[("good.mp3", None)]),
    );

    let outcome = build(AggregatorConfig::default(), &catalog, query).run().await;

    assert_eq!(urls(&outcome), vec![download("good", "good.mp3")]);
    assert_eq!(outcome.stats.items_skipped, 1);
    assert_eq!(outcome.stats.items_seen, 2);
}

/// Test fallback after the primary tier fails
#[tokio::test]
async fn test_fallback_after_primary_failure() {
    let query = bbc_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_failing(&query.build(0))
            .with_pages(&query.build(1), &[&["broad"]])
            .with_manifest("broad", &[("broad.mp3", None)]),
    );

    let outcome = build(AggregatorConfig::default(), &catalog, query).run().await;

    assert_eq!(urls(&outcome), vec![download("broad", "broad.mp3")]);
    assert_eq!(outcome.stats.tiers_failed, 1);
    assert_eq!(outcome.stats.tiers_exhausted, 2);
}

/// Test that a disabled fallback is never searched
#[tokio::test]
async fn test_disabled_fallback_is_not_used() {
    let query = bbc_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(1), &[&["broad"]])
            .with_manifest("broad", &[("broad.mp3", None)]),
    );

    let config = AggregatorConfig::default().with_fallback(false);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert!(outcome.batch.is_empty());
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 1);
}

/// Test that the fallback is not searched once the primary tier fills the batch
#[tokio::test]
async fn test_fallback_skipped_when_target_met() {
    let query = bbc_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["scoped"]])
            .with_pages(&query.build(1), &[&["broad"]])
            .with_manifest("scoped", &[("scoped.mp3", None)])
            .with_manifest("broad", &[("broad.mp3", None)]),
    );

    let config = AggregatorConfig::default().with_target_count(1);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(urls(&outcome), vec![download("scoped", "scoped.mp3")]);
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 1);
}

/// Test the per-tier page ceiling
///
/// The catalog keeps reporting more results; the run must stop after the
/// configured number of pages.
#[tokio::test]
async fn test_page_ceiling() {
    let query = sitewide_query();
    let catalog = Arc::new(FakeCatalog::default().with_pages(
        &query.build(0),
        &[&["p1"], &["p2"], &["p3"], &["p4"], &["p5"]],
    ));

    let config = AggregatorConfig::default()
        .with_page_size(1)
        .with_max_pages(2);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert_eq!(outcome.stats.pages_fetched, 2);
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 2);
}

/// Test that identifiers repeated across pages are resolved once
#[tokio::test]
async fn test_items_seen_once() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a", "b"], &["b", "c"]])
            .with_manifest("a", &[("a.mp3", None)])
            .with_manifest("b", &[("b.mp3", None)])
            .with_manifest("c", &[("c.mp3", None)]),
    );

    let config = AggregatorConfig::default().with_page_size(2);
    let outcome = build(config, &catalog, query).run().await;

    assert_eq!(outcome.stats.items_seen, 3);
    assert_eq!(catalog.manifest_calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.batch.len(), 3);
}

/// Test that duplicate manifest entries never duplicate a URL
#[tokio::test]
async fn test_no_duplicate_urls() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a"]])
            .with_manifest("a", &[("same.mp3", None), ("same.mp3", None), ("other.mp3", None)]),
    );

    let outcome = build(AggregatorConfig::default(), &catalog, query).run().await;

    assert_eq!(outcome.batch.len(), 2);
    assert_eq!(outcome.stats.duplicates, 1);
    let unique: HashSet<String> = urls(&outcome).into_iter().collect();
    assert_eq!(unique.len(), outcome.batch.len());
}

/// Test that a pending cancellation stops the run before any request
#[tokio::test]
async fn test_cancellation_before_start() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a"]])
            .with_manifest("a", &[("a.mp3", None)]),
    );
    let (tx, rx) = create_shutdown_channel();
    tx.send(()).unwrap();

    let outcome = build(AggregatorConfig::default(), &catalog, query)
        .with_shutdown(rx)
        .run()
        .await;

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert!(outcome.batch.is_empty());
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 0);
}

/// Test that a cancellation arriving mid-run keeps what was collected
///
/// The shutdown fires while the first page is being resolved, so the second
/// page is never requested and the partial batch is returned.
#[tokio::test]
async fn test_cancellation_between_pages() {
    let query = sitewide_query();
    let (tx, rx) = create_shutdown_channel();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a"], &["b"]])
            .with_manifest("a", &[("a.mp3", None)])
            .with_manifest("b", &[("b.mp3", None)])
            .cancelling_on("a", tx),
    );

    let config = AggregatorConfig::default()
        .with_target_count(2)
        .with_page_size(1)
        .with_concurrency(1);
    let outcome = build(config, &catalog, query)
        .with_shutdown(rx)
        .run()
        .await;

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(urls(&outcome), vec![download("a", "a.mp3")]);
    assert_eq!(catalog.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.manifest_calls.load(Ordering::SeqCst), 1);
}

/// Test that progress events report tier, page and acceptance
#[tokio::test]
async fn test_progress_events() {
    let query = sitewide_query();
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_pages(&query.build(0), &[&["a"]])
            .with_manifest("a", &[("a.mp3", None)]),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let config = AggregatorConfig::default().with_target_count(1);
    build(config, &catalog, query).with_progress(tx).run().await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], ProgressEvent::TierStarted { .. }));
    assert_eq!(events[1], ProgressEvent::PageFetched { page: 1, items: 1 });
    assert_eq!(
        events[2],
        ProgressEvent::Accepted {
            collected: 1,
            target: 1
        }
    );
}

/// Test that an invalid configuration is rejected at construction
#[test]
fn test_invalid_config_rejected() {
    let catalog: Arc<dyn HttpTransport> = Arc::new(FakeCatalog::default());
    let result = Aggregator::new(
        AggregatorConfig::default().with_target_count(0),
        catalog,
        &endpoints(),
        sitewide_query(),
    );
    assert!(result.is_err());
}
