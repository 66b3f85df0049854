//! Configuration structures for the aggregator
//!
//! One [`AggregatorConfig`] describes a complete curation variant: how many
//! URLs to collect, how far to page, which files qualify, and how they rank.

use serde::{Deserialize, Serialize};

use crate::app::filter::FilterConstraints;
use crate::app::rank::FormatPreference;
use crate::constants::{catalog, search};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of URLs to collect
    pub target_count: usize,
    /// Rows requested per search page
    pub page_size: u32,
    /// Hard ceiling on pages fetched per tier
    pub max_pages_per_tier: u32,
    /// Concurrent manifest requests per page
    pub resolve_concurrency: usize,
    /// Whether the broader fallback tier may be used
    pub fallback_enabled: bool,
    /// Skip URLs present in the ledger snapshot
    pub dedup_enabled: bool,
    /// File qualification rules
    pub constraints: FilterConstraints,
    /// Extension ranking
    pub preference: FormatPreference,
    /// Fields requested from the search endpoint
    pub fields: Vec<String>,
    /// Sort clauses sent to the search endpoint
    pub sort: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            target_count: search::DEFAULT_TARGET_COUNT,
            page_size: search::DEFAULT_PAGE_SIZE,
            max_pages_per_tier: search::DEFAULT_MAX_PAGES_PER_TIER,
            resolve_concurrency: search::DEFAULT_RESOLVE_CONCURRENCY,
            fallback_enabled: true,
            dedup_enabled: false,
            constraints: FilterConstraints::default(),
            preference: FormatPreference::default(),
            fields: catalog::DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            sort: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    pub fn with_target_count(mut self, count: usize) -> Self {
        self.target_count = count;
        self
    }

    pub fn with_page_size(mut self, rows: u32) -> Self {
        self.page_size = rows;
        self
    }

    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages_per_tier = pages;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.resolve_concurrency = concurrency;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup_enabled = enabled;
        self
    }

    pub fn with_constraints(mut self, constraints: FilterConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_preference(mut self, preference: FormatPreference) -> Self {
        self.preference = preference;
        self
    }

    /// Set the search fields and sort clauses
    pub fn with_search_shape(mut self, fields: Vec<String>, sort: Vec<String>) -> Self {
        self.fields = fields;
        self.sort = sort;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.target_count == 0 {
            return Err(invalid("search.count", self.target_count, "must be at least 1"));
        }

        if self.page_size == 0 {
            return Err(invalid("search.rows", self.page_size, "must be at least 1"));
        }

        if self.max_pages_per_tier == 0 {
            return Err(invalid(
                "search.max_pages",
                self.max_pages_per_tier,
                "must be at least 1",
            ));
        }

        if self.resolve_concurrency == 0 || self.resolve_concurrency > search::MAX_RESOLVE_CONCURRENCY
        {
            return Err(invalid(
                "search.concurrency",
                self.resolve_concurrency,
                &format!("must be between 1 and {}", search::MAX_RESOLVE_CONCURRENCY),
            ));
        }

        if self.constraints.allowed_extensions.is_empty() {
            return Err(invalid("filter.formats", "", "at least one extension is required"));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
