//! Core application logic for NetSound Fetcher
//!
//! This module contains the curation pipeline: query composition, the HTTP
//! transport, catalog search and manifests, filtering and ranking, the dedup
//! ledger, output lists, and the aggregator that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use netsound_fetcher::app::{
//!     build_transport, Aggregator, AggregatorConfig, CatalogEndpoints, ClientConfig,
//!     NamingPolicy, OutputWriter, QueryBuilder, SearchPreset,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = build_transport(&ClientConfig::default())?;
//! let query = QueryBuilder::from_preset("wind", SearchPreset::Bbc);
//! let config = AggregatorConfig::default().with_target_count(5);
//!
//! let outcome = Aggregator::new(config, transport, &CatalogEndpoints::default(), query)?
//!     .run()
//!     .await;
//!
//! let writer = OutputWriter::new("netsound", NamingPolicy::default());
//! let path = writer.write(&outcome.batch).await?;
//! println!("Wrote {} URLs to {}", outcome.batch.len(), path.display());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod catalog;
pub mod client;
pub mod filter;
pub mod ledger;
pub mod models;
pub mod output;
pub mod query;
pub mod rank;

// Re-export main public API
pub use aggregator::{
    create_shutdown_channel, Aggregator, AggregatorConfig, ProgressEvent, RunOutcome, RunStats,
    RunStatus, SignalHandler,
};
pub use catalog::{parse_duration, CatalogClient, CatalogEndpoints, ManifestResolver, SearchPage};
pub use client::{
    build_transport, ClientConfig, HttpResponse, HttpTransport, ReqwestTransport, RetryPolicy,
    RetryingTransport,
};
pub use filter::{candidate_url, CandidateFilter, FilterConstraints};
pub use ledger::{DedupLedger, LedgerSnapshot};
pub use models::{Candidate, CatalogItem, FileManifestEntry, ResultBatch, SearchTier, TierKind};
pub use output::{NamingPolicy, OutputWriter};
pub use query::{QueryBuilder, SearchPreset, SearchScope};
pub use rank::{FormatPreference, Ranker};
