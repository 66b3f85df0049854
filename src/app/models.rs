//! Data models for NetSound Fetcher
//!
//! This module defines the records that flow through the curation pipeline:
//! catalog items from search, manifest entries from item metadata, the
//! candidates derived from them, and the bounded batch a run emits.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A search hit from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog-unique identifier
    pub identifier: String,
    /// Human-readable title (empty when the catalog omits it)
    pub title: String,
    /// Collections or other source tags the item belongs to
    pub source_tags: BTreeSet<String>,
}

/// One file listed in an item's manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileManifestEntry {
    /// File name relative to the item, may contain `/`
    pub name: String,
    /// Free-form format string reported by the catalog
    pub format_hint: String,
    /// Duration in seconds when known
    pub duration_seconds: Option<f64>,
    /// Size in bytes when known
    pub size_bytes: Option<u64>,
}

impl FileManifestEntry {
    /// Create an entry with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format_hint: String::new(),
            duration_seconds: None,
            size_bytes: None,
        }
    }

    /// Lowercased extension taken from the final path segment after the last `.`
    ///
    /// Returns `None` when the segment has no `.` or nothing follows it.
    pub fn extension(&self) -> Option<String> {
        let segment = self.name.rsplit('/').next().unwrap_or(&self.name);
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

/// A manifest entry that passed filtering and carries its download URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Fully encoded download URL
    pub url: String,
    /// Lowercased file extension
    pub extension: String,
    /// Duration in seconds when known
    pub duration_seconds: Option<f64>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration_seconds {
            Some(d) => write!(f, "{} (dur={:.2}s)", self.url, d),
            None => write!(f, "{} (dur=?)", self.url),
        }
    }
}

/// Ordered, duplicate-free, bounded sequence of candidates
#[derive(Debug, Clone, Default)]
pub struct ResultBatch {
    candidates: Vec<Candidate>,
    urls: HashSet<String>,
    target: usize,
}

impl ResultBatch {
    /// Create an empty batch holding at most `target` candidates
    pub fn new(target: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(target),
            urls: HashSet::with_capacity(target),
            target,
        }
    }

    /// Append a candidate, refusing duplicates and overflow
    ///
    /// Returns `true` when the candidate was added.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.is_full() || self.urls.contains(&candidate.url) {
            return false;
        }
        self.urls.insert(candidate.url.clone());
        self.candidates.push(candidate);
        true
    }

    /// Whether a URL is already part of the batch
    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Whether the batch reached its target
    pub fn is_full(&self) -> bool {
        self.candidates.len() >= self.target
    }

    /// Requested size of the batch
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates in emission order
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// URLs in emission order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.url.as_str())
    }
}

/// Role of a search tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierKind {
    /// Scoped query, always tried first
    Primary,
    /// Broader query tried only while the target is unmet
    Fallback,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierKind::Primary => write!(f, "primary"),
            TierKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// One query strategy attempt and its paging state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTier {
    /// Position in the tier progression, 0 = primary
    pub index: usize,
    /// Role of the tier
    pub kind: TierKind,
    /// Query expression in the catalog's language
    pub query: String,
    /// Next page to fetch, 1-based
    pub next_page: u32,
    /// Whether results from this tier may satisfy the run target
    pub enabled: bool,
    /// Set once the tier has no more usable pages
    pub exhausted: bool,
}

impl SearchTier {
    /// Create a tier positioned at page 1
    pub fn new(index: usize, kind: TierKind, query: impl Into<String>, enabled: bool) -> Self {
        Self {
            index,
            kind,
            query: query.into(),
            next_page: 1,
            enabled,
            exhausted: false,
        }
    }

    /// Whether the tier can still be selected
    pub fn is_available(&self) -> bool {
        self.enabled && !self.exhausted
    }
}
