//! Run statistics and outcome
//!
//! The aggregator never fails a run because of a single page or item; what it
//! absorbed is counted here so the caller can report it.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::models::ResultBatch;

/// Counters collected during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Search pages fetched successfully
    pub pages_fetched: usize,
    /// Distinct catalog items visited
    pub items_seen: usize,
    /// Items skipped because their manifest could not be resolved
    pub items_skipped: usize,
    /// Manifest entries rejected by the filter
    pub entries_rejected: usize,
    /// Candidates dropped because the ledger already had them
    pub ledger_hits: usize,
    /// Candidates dropped because the batch already had them
    pub duplicates: usize,
    /// Tiers that ran out of pages, hit the page ceiling, or failed
    pub tiers_exhausted: usize,
    /// Tiers abandoned because of a catalog error
    pub tiers_failed: usize,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            pages_fetched: 0,
            items_seen: 0,
            items_skipped: 0,
            entries_rejected: 0,
            ledger_hits: 0,
            duplicates: 0,
            tiers_exhausted: 0,
            tiers_failed: 0,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }
}

impl RunStats {
    /// Update elapsed time from start time
    pub fn update_elapsed(&mut self) {
        self.elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Target count reached
    Done,
    /// Every enabled tier ran dry first
    Exhausted,
    /// Cancellation was requested
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Done => write!(f, "done"),
            RunStatus::Exhausted => write!(f, "exhausted"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final result of an aggregation run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub batch: ResultBatch,
    pub status: RunStatus,
    pub stats: RunStats,
}

impl RunOutcome {
    /// Whether fewer URLs than requested were found
    pub fn is_short(&self) -> bool {
        self.batch.len() < self.batch.target()
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{}/{} URLs ({}), {} pages, {} items, {} skipped, {} ledger hits, {:.1}s",
            self.batch.len(),
            self.batch.target(),
            self.status,
            self.stats.pages_fetched,
            self.stats.items_seen,
            self.stats.items_skipped,
            self.stats.ledger_hits,
            self.stats.elapsed.as_secs_f64()
        )
    }
}

/// Progress notifications emitted while a run is in flight
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A tier was selected
    TierStarted { kind: String, query: String },
    /// A search page arrived
    PageFetched { page: u32, items: usize },
    /// The batch grew
    Accepted { collected: usize, target: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Candidate;

    #[test]
    fn test_short_outcome() {
        let mut batch = ResultBatch::new(2);
        batch.push(Candidate {
            url: "https://a/1.mp3".to_string(),
            extension: "mp3".to_string(),
            duration_seconds: None,
        });

        let outcome = RunOutcome {
            batch,
            status: RunStatus::Exhausted,
            stats: RunStats::default(),
        };
        assert!(outcome.is_short());
        assert!(outcome.summary().starts_with("1/2 URLs (exhausted)"));
    }

    #[test]
    fn test_elapsed_updates() {
        let mut stats = RunStats {
            started_at: Utc::now() - chrono::Duration::seconds(2),
            ..Default::default()
        };
        stats.update_elapsed();
        assert!(stats.elapsed >= Duration::from_secs(2));
    }
}
