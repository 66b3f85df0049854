//! Candidate ordering
//!
//! Candidates are ordered by format preference first and by ascending known
//! duration second. The sort is stable, so ties keep catalog order and ranking
//! an already ranked list changes nothing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::app::models::Candidate;
use crate::constants::search;

/// Total order over file extensions, most preferred first
///
/// Extensions missing from the list rank after every listed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPreference {
    order: Vec<String>,
}

impl Default for FormatPreference {
    fn default() -> Self {
        Self::new(search::DEFAULT_FORMAT_PREFERENCE.iter().copied())
    }
}

impl FormatPreference {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in order {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self { order: normalized }
    }

    /// Position of an extension, unlisted ones share the last rank
    pub fn rank_of(&self, extension: &str) -> usize {
        self.order
            .iter()
            .position(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(self.order.len())
    }
}

/// Orders candidates by format preference then by duration
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    preference: FormatPreference,
}

impl Ranker {
    pub fn new(preference: FormatPreference) -> Self {
        Self { preference }
    }

    /// Stable sort of `candidates`
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| self.compare(a, b));
        candidates
    }

    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        self.preference
            .rank_of(&a.extension)
            .cmp(&self.preference.rank_of(&b.extension))
            .then_with(|| compare_duration(a.duration_seconds, b.duration_seconds))
    }
}

/// Known durations ascending, unknown after all known ones
fn compare_duration(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
