//! Tiered discovery and accumulation
//!
//! The aggregator drives the whole curation pipeline for one run. It walks the
//! search tiers in order, pages through each one, resolves item manifests,
//! filters and ranks their files, and accumulates candidates until the target
//! count is reached or every enabled tier is exhausted.
//!
//! # Architecture
//!
//! - [`config`] - Run configuration and validation
//! - [`stats`] - Counters, run status and outcome
//! - [`signals`] - Cancellation through a broadcast channel
//!
//! # State machine
//!
//! ```text
//! TierSelect -> PageFetch -> ItemResolve -> (TierSelect | PageFetch | Done)
//!      |
//!      +-> Done | Exhausted          any state -> Cancelled
//! ```
//!
//! Per-page and per-item failures are logged and absorbed: a failed page ends
//! its tier, a failed manifest skips its item. The run itself never fails.

pub mod config;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::app::catalog::{CatalogClient, CatalogEndpoints, ManifestResolver};
use crate::app::client::HttpTransport;
use crate::app::filter::CandidateFilter;
use crate::app::ledger::LedgerSnapshot;
use crate::app::models::{Candidate, CatalogItem, ResultBatch, SearchTier};
use crate::app::query::QueryBuilder;
use crate::app::rank::Ranker;
use crate::errors::ConfigResult;

pub use config::AggregatorConfig;
pub use signals::{create_shutdown_channel, CancellationToken, SignalHandler};
pub use stats::{ProgressEvent, RunOutcome, RunStats, RunStatus};

/// Position in the run state machine
#[derive(Debug)]
enum RunState {
    TierSelect,
    PageFetch { tier: usize },
    ItemResolve { tier: usize, items: Vec<CatalogItem> },
    Finished(RunStatus),
}

/// Orchestrates one bounded curation run
#[derive(Debug)]
pub struct Aggregator {
    config: AggregatorConfig,
    query: QueryBuilder,
    catalog: CatalogClient,
    resolver: ManifestResolver,
    filter: CandidateFilter,
    ranker: Ranker,
    ledger: LedgerSnapshot,
    cancellation: CancellationToken,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Aggregator {
    /// Create an aggregator over the given catalog
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration, validated here
    /// * `transport` - Shared HTTP transport (retries included)
    /// * `endpoints` - Catalog base URLs
    /// * `query` - Query builder producing the tier expressions
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configuration is invalid
    pub fn new(
        config: AggregatorConfig,
        transport: Arc<dyn HttpTransport>,
        endpoints: &CatalogEndpoints,
        query: QueryBuilder,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let catalog = CatalogClient::new(transport.clone(), endpoints.search_url.clone())
            .with_fields(config.fields.clone())
            .with_sort(config.sort.clone());
        let resolver = ManifestResolver::new(transport, endpoints.metadata_url.clone());
        let filter = CandidateFilter::new(config.constraints.clone(), endpoints.download_base.clone());
        let ranker = Ranker::new(config.preference.clone());

        Ok(Self {
            config,
            query,
            catalog,
            resolver,
            filter,
            ranker,
            ledger: LedgerSnapshot::new(),
            cancellation: CancellationToken::default(),
            progress: None,
        })
    }

    /// Use a ledger snapshot for dedup (only consulted when dedup is enabled)
    pub fn with_ledger(mut self, ledger: LedgerSnapshot) -> Self {
        self.ledger = ledger;
        self
    }

    /// Stop early when the channel broadcasts
    pub fn with_shutdown(mut self, shutdown_rx: broadcast::Receiver<()>) -> Self {
        self.cancellation = CancellationToken::new(Some(shutdown_rx));
        self
    }

    /// Report progress events on the given channel
    pub fn with_progress(mut self, progress_tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(progress_tx);
        self
    }

    /// Run to completion and return the collected batch
    pub async fn run(mut self) -> RunOutcome {
        let mut tiers = self.query.tiers(self.config.fallback_enabled);
        let mut batch = ResultBatch::new(self.config.target_count);
        let mut stats = RunStats::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cancellation = std::mem::take(&mut self.cancellation);

        for tier in &tiers {
            debug!("Tier {} ({}, enabled = {}): {}", tier.index, tier.kind, tier.enabled, tier.query);
        }

        let mut state = RunState::TierSelect;
        let status = loop {
            if let RunState::Finished(status) = state {
                break status;
            }
            if cancellation.is_cancelled() {
                info!("Cancellation requested, stopping with {} URLs", batch.len());
                break RunStatus::Cancelled;
            }

            state = match state {
                RunState::TierSelect => self.select_tier(&tiers, &batch),
                RunState::PageFetch { tier } => {
                    self.fetch_page(&mut tiers[tier], tier, &mut stats).await
                }
                RunState::ItemResolve { tier, items } => {
                    self.resolve_items(items, &mut seen, &mut batch, &mut stats, &mut cancellation)
                        .await;
                    if batch.is_full() {
                        RunState::Finished(RunStatus::Done)
                    } else if tiers[tier].exhausted {
                        RunState::TierSelect
                    } else {
                        RunState::PageFetch { tier }
                    }
                }
                RunState::Finished(status) => RunState::Finished(status),
            };
        };

        stats.tiers_exhausted = tiers.iter().filter(|t| t.exhausted).count();
        stats.update_elapsed();

        let outcome = RunOutcome {
            batch,
            status,
            stats,
        };
        info!("Run finished: {}", outcome.summary());
        outcome
    }

    /// TIER_SELECT: first available tier while the target is unmet
    fn select_tier(&self, tiers: &[SearchTier], batch: &ResultBatch) -> RunState {
        if batch.is_full() {
            return RunState::Finished(RunStatus::Done);
        }

        match tiers.iter().position(SearchTier::is_available) {
            Some(index) => {
                let tier = &tiers[index];
                if tier.next_page == 1 {
                    info!("Searching {} tier: {}", tier.kind, tier.query);
                    self.emit(ProgressEvent::TierStarted {
                        kind: tier.kind.to_string(),
                        query: tier.query.clone(),
                    });
                }
                RunState::PageFetch { tier: index }
            }
            None => {
                info!("All enabled tiers exhausted with {} URLs", batch.len());
                RunState::Finished(RunStatus::Exhausted)
            }
        }
    }

    /// PAGE_FETCH: one page of the current tier
    async fn fetch_page(&self, tier: &mut SearchTier, index: usize, stats: &mut RunStats) -> RunState {
        if tier.next_page > self.config.max_pages_per_tier {
            info!(
                "{} tier reached the {} page ceiling",
                tier.kind, self.config.max_pages_per_tier
            );
            tier.exhausted = true;
            return RunState::TierSelect;
        }

        let page_number = tier.next_page;
        match self
            .catalog
            .search(&tier.query, self.config.page_size, page_number)
            .await
        {
            Ok(page) => {
                stats.pages_fetched += 1;
                tier.next_page += 1;
                self.emit(ProgressEvent::PageFetched {
                    page: page_number,
                    items: page.items.len(),
                });

                if page.items.is_empty() {
                    debug!("{} tier page {} is empty", tier.kind, page_number);
                    tier.exhausted = true;
                    return RunState::TierSelect;
                }
                if !page.has_more {
                    tier.exhausted = true;
                }
                RunState::ItemResolve {
                    tier: index,
                    items: page.items,
                }
            }
            Err(e) => {
                warn!("Abandoning {} tier at page {}: {}", tier.kind, page_number, e);
                stats.tiers_failed += 1;
                tier.exhausted = true;
                RunState::TierSelect
            }
        }
    }

    /// ITEM_RESOLVE + ACCUMULATE for the new items of one page
    ///
    /// Manifests are fetched concurrently but consumed in catalog order, so
    /// the batch does not depend on completion timing.
    async fn resolve_items(
        &self,
        items: Vec<CatalogItem>,
        seen: &mut HashSet<String>,
        batch: &mut ResultBatch,
        stats: &mut RunStats,
        cancellation: &mut CancellationToken,
    ) {
        let fresh: Vec<CatalogItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.identifier.clone()))
            .collect();
        stats.items_seen += fresh.len();

        let resolver = &self.resolver;
        let mut manifests = stream::iter(fresh)
            .map(|item| async move {
                let result = resolver.resolve(&item.identifier).await;
                (item, result)
            })
            .buffered(self.config.resolve_concurrency);

        while let Some((item, result)) = manifests.next().await {
            let entries = match result {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping item {}: {}", item.identifier, e);
                    stats.items_skipped += 1;
                    continue;
                }
            };

            let candidates = self.filter.filter(&item.identifier, &entries);
            stats.entries_rejected += entries.len() - candidates.len();
            let ranked = self.ranker.rank(candidates);
            self.accumulate(ranked, batch, stats);

            if batch.is_full() || cancellation.is_cancelled() {
                break;
            }
        }
    }

    /// ACCUMULATE: append ranked candidates not already emitted
    fn accumulate(&self, ranked: Vec<Candidate>, batch: &mut ResultBatch, stats: &mut RunStats) {
        for candidate in ranked {
            if batch.is_full() {
                break;
            }
            if self.config.dedup_enabled && self.ledger.contains(&candidate.url) {
                debug!("Ledger already has {}", candidate.url);
                stats.ledger_hits += 1;
                continue;
            }
            if batch.contains_url(&candidate.url) {
                stats.duplicates += 1;
                continue;
            }

            debug!("Accepted {}", candidate);
            batch.push(candidate);
            self.emit(ProgressEvent::Accepted {
                collected: batch.len(),
                target: batch.target(),
            });
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(event);
        }
    }
}
