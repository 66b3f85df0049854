//! Candidate qualification
//!
//! Turns manifest entries into download candidates. The file extension is the
//! only format signal used for qualification; duration and size ceilings only
//! reject entries whose value is known and exceeds the ceiling.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::app::models::{Candidate, FileManifestEntry};
use crate::constants::search;

/// Qualification rules for manifest entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConstraints {
    /// Lowercased extensions without the leading dot
    pub allowed_extensions: BTreeSet<String>,
    /// Duration ceiling in seconds, `None` or 0 means unconstrained
    pub max_duration_seconds: Option<f64>,
    /// Size ceiling in bytes, `None` or 0 means unconstrained
    pub max_size_bytes: Option<f64>,
    /// Lowercased tokens rejected when found anywhere in the entry name
    pub excluded_name_tokens: Vec<String>,
}

impl Default for FilterConstraints {
    fn default() -> Self {
        Self::new(search::DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl FilterConstraints {
    /// Constraints allowing the given extensions and nothing else
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            max_duration_seconds: None,
            max_size_bytes: None,
            excluded_name_tokens: Vec::new(),
        }
    }

    pub fn with_max_duration(mut self, seconds: Option<f64>) -> Self {
        self.max_duration_seconds = seconds;
        self
    }

    pub fn with_max_size_bytes(mut self, bytes: Option<f64>) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    pub fn exclude_name_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref().trim().to_lowercase();
            if !token.is_empty() && !self.excluded_name_tokens.contains(&token) {
                self.excluded_name_tokens.push(token);
            }
        }
        self
    }

    /// Check one entry, returning its extension when it qualifies
    pub fn check(&self, entry: &FileManifestEntry) -> Result<String, Rejection> {
        let extension = entry.extension().ok_or(Rejection::NoExtension)?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(Rejection::Extension(extension));
        }

        let name = entry.name.to_lowercase();
        if let Some(token) = self
            .excluded_name_tokens
            .iter()
            .find(|t| name.contains(t.as_str()))
        {
            return Err(Rejection::NameToken(token.clone()));
        }

        if let (Some(limit), Some(duration)) = (ceiling(self.max_duration_seconds), entry.duration_seconds)
        {
            if duration > limit {
                return Err(Rejection::TooLong(duration));
            }
        }

        if let (Some(limit), Some(size)) = (ceiling(self.max_size_bytes), entry.size_bytes) {
            if size as f64 > limit {
                return Err(Rejection::TooLarge(size));
            }
        }

        Ok(extension)
    }
}

/// A positive ceiling, or `None` when unconstrained
fn ceiling(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Why an entry failed qualification
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoExtension,
    Extension(String),
    NameToken(String),
    TooLong(f64),
    TooLarge(u64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoExtension => write!(f, "no extension"),
            Rejection::Extension(ext) => write!(f, "extension '{}' not allowed", ext),
            Rejection::NameToken(token) => write!(f, "name contains '{}'", token),
            Rejection::TooLong(d) => write!(f, "duration {:.1}s over ceiling", d),
            Rejection::TooLarge(s) => write!(f, "size {} bytes over ceiling", s),
        }
    }
}

/// Applies [`FilterConstraints`] and derives download URLs
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    constraints: FilterConstraints,
    download_base: String,
}

impl CandidateFilter {
    pub fn new(constraints: FilterConstraints, download_base: impl Into<String>) -> Self {
        Self {
            constraints,
            download_base: download_base.into(),
        }
    }

    pub fn constraints(&self) -> &FilterConstraints {
        &self.constraints
    }

    /// Qualifying entries of one item, in manifest order
    pub fn filter(&self, identifier: &str, entries: &[FileManifestEntry]) -> Vec<Candidate> {
        entries
            .iter()
            .filter_map(|entry| match self.constraints.check(entry) {
                Ok(extension) => Some(Candidate {
                    url: candidate_url(&self.download_base, identifier, &entry.name),
                    extension,
                    duration_seconds: entry.duration_seconds,
                }),
                Err(reason) => {
                    trace!("Rejected {}/{} ({}): {}", identifier, entry.name, entry.format_hint, reason);
                    None
                }
            })
            .collect()
    }
}

/// Join base, identifier and file name into a download URL
///
/// Every path segment is percent-encoded on its own, so `/` separators in
/// the file name survive while spaces and reserved characters are escaped.
pub fn candidate_url(download_base: &str, identifier: &str, name: &str) -> String {
    let mut url = download_base.trim_end_matches('/').to_string();
    for segment in std::iter::once(identifier).chain(name.split('/')) {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}
