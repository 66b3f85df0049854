//! Search expression construction
//!
//! Builds catalog query expressions from a free-text term and scoping rules.
//! Tier 0 is the scoped expression; tier 1 drops every scope-narrowing clause
//! so the fallback pool is a superset of the primary one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::models::{SearchTier, TierKind};
use crate::constants::catalog;
use crate::errors::ConfigError;

/// Tokens that mark a term as an advanced expression to pass through
const ADVANCED_MARKERS: &[&str] = &[" OR ", " AND ", " NOT ", "(", ")"];

/// Field prefixes that mark a term as an advanced expression
const FIELD_PREFIXES: &[&str] = &[
    "title:",
    "creator:",
    "collection:",
    "mediatype:",
    "subject:",
    "text:",
    "description:",
    "identifier:",
];

/// Where the primary tier looks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SearchScope {
    /// Restrict to the listed collections
    Collections { collections: Vec<String> },
    /// Whole catalog
    Sitewide,
    /// No implicit clauses at all
    Raw,
}

/// Named scope and exclusion bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPreset {
    /// BBC sound effect collections
    Bbc,
    /// BBC plus community sound effect collections
    Sfx,
    /// Whole catalog minus spoken word and radio collections
    Sitewide,
    /// Term used as given
    Raw,
}

impl SearchPreset {
    /// Scope searched by the primary tier
    pub fn scope(&self) -> SearchScope {
        match self {
            SearchPreset::Bbc => SearchScope::Collections {
                collections: to_owned_list(catalog::BBC_COLLECTIONS),
            },
            SearchPreset::Sfx => SearchScope::Collections {
                collections: to_owned_list(catalog::SFX_COLLECTIONS),
            },
            SearchPreset::Sitewide => SearchScope::Sitewide,
            SearchPreset::Raw => SearchScope::Raw,
        }
    }

    /// Collections excluded by default
    pub fn excluded_collections(&self) -> Vec<String> {
        match self {
            SearchPreset::Sitewide => to_owned_list(catalog::SITEWIDE_EXCLUDED_COLLECTIONS),
            _ => Vec::new(),
        }
    }

    /// Fields requested from the search endpoint
    pub fn fields(&self) -> Vec<String> {
        match self {
            SearchPreset::Sitewide => to_owned_list(catalog::SITEWIDE_FIELDS),
            _ => to_owned_list(catalog::DEFAULT_FIELDS),
        }
    }

    /// Sort clauses sent with every search
    pub fn sort(&self) -> Vec<String> {
        match self {
            SearchPreset::Sitewide => vec![catalog::SITEWIDE_SORT.to_string()],
            _ => Vec::new(),
        }
    }

    /// Media type restriction, none for raw expressions
    pub fn media_type(&self) -> Option<String> {
        match self {
            SearchPreset::Raw => None,
            _ => Some(catalog::AUDIO_MEDIA_TYPE.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPreset::Bbc => "bbc",
            SearchPreset::Sfx => "sfx",
            SearchPreset::Sitewide => "sitewide",
            SearchPreset::Raw => "raw",
        }
    }
}

impl FromStr for SearchPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bbc" => Ok(SearchPreset::Bbc),
            "sfx" => Ok(SearchPreset::Sfx),
            "sitewide" => Ok(SearchPreset::Sitewide),
            "raw" => Ok(SearchPreset::Raw),
            _ => Err(ConfigError::UnknownPreset {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SearchPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composes tiered search expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    term: String,
    scope: SearchScope,
    media_type: Option<String>,
    excluded_title_tokens: Vec<String>,
    excluded_collections: Vec<String>,
    included_subjects: Vec<String>,
}

impl QueryBuilder {
    /// Create a builder for a term with sitewide audio scope
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            scope: SearchScope::Sitewide,
            media_type: Some(catalog::AUDIO_MEDIA_TYPE.to_string()),
            excluded_title_tokens: Vec::new(),
            excluded_collections: Vec::new(),
            included_subjects: Vec::new(),
        }
    }

    /// Create a builder preloaded with a preset's scope and exclusions
    pub fn from_preset(term: impl Into<String>, preset: SearchPreset) -> Self {
        Self::new(term)
            .with_scope(preset.scope())
            .with_media_type(preset.media_type())
            .exclude_collections(preset.excluded_collections())
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_media_type(mut self, media_type: Option<String>) -> Self {
        self.media_type = media_type;
        self
    }

    /// Reject items whose title contains any of the tokens
    pub fn exclude_title_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.excluded_title_tokens, tokens);
        self
    }

    /// Reject items from any of the collections (primary tier only)
    pub fn exclude_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.excluded_collections, collections);
        self
    }

    /// Require at least one of the subjects (primary tier only)
    pub fn include_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.included_subjects, subjects);
        self
    }

    /// Check that every excluded collection is a single bare identifier
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a collection name containing
    /// whitespace, which the catalog would read as two clauses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for collection in &self.excluded_collections {
            if sanitize_phrase(collection).contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    field: "search.exclude_collections".to_string(),
                    value: collection.clone(),
                    reason: "Collection identifiers cannot contain whitespace".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the expression for a tier; any index above 0 is the fallback
    pub fn build(&self, tier: usize) -> String {
        let scoped = tier == 0;
        let mut positive: Vec<String> = Vec::new();

        if scoped {
            if let SearchScope::Collections { collections } = &self.scope {
                let clauses: Vec<String> = collections
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(|c| format!("collection:{}", c))
                    .collect();
                if !clauses.is_empty() {
                    positive.push(format!("({})", clauses.join(" OR ")));
                }
            }
        }

        if let Some(media_type) = self.media_type.as_deref().map(str::trim) {
            if !media_type.is_empty() {
                positive.push(format!("mediatype:{}", media_type));
            }
        }

        if let Some(text) = text_clause(&self.term) {
            positive.push(text);
        }

        if scoped {
            let subjects: Vec<String> = self
                .included_subjects
                .iter()
                .map(|s| sanitize_phrase(s))
                .filter(|s| !s.is_empty())
                .map(|s| format!("subject:\"{}\"", s))
                .collect();
            if !subjects.is_empty() {
                positive.push(format!("({})", subjects.join(" OR ")));
            }
        }

        let mut negative: Vec<String> = self
            .excluded_title_tokens
            .iter()
            .map(|t| sanitize_phrase(t))
            .filter(|t| !t.is_empty())
            .map(|t| format!("NOT title:\"{}\"", t))
            .collect();

        if scoped {
            negative.extend(
                self.excluded_collections
                    .iter()
                    .map(|c| sanitize_phrase(c))
                    .filter(|c| !c.is_empty() && !c.contains(char::is_whitespace))
                    .map(|c| format!("NOT collection:{}", c)),
            );
        }

        if positive.is_empty() {
            positive.push("*:*".to_string());
        }
        positive.extend(negative);
        positive.join(" AND ")
    }

    /// Build the tier progression
    ///
    /// The fallback tier is disabled when not requested or when it would repeat
    /// the primary expression verbatim.
    pub fn tiers(&self, fallback_enabled: bool) -> Vec<SearchTier> {
        let primary = self.build(0);
        let fallback = self.build(1);
        let fallback_useful = fallback_enabled && fallback != primary;
        vec![
            SearchTier::new(0, TierKind::Primary, primary, true),
            SearchTier::new(1, TierKind::Fallback, fallback, fallback_useful),
        ]
    }
}

/// Whether a term is already written in the catalog's expression language
pub fn looks_advanced(term: &str) -> bool {
    let trimmed = term.trim();
    trimmed.starts_with("NOT ")
        || ADVANCED_MARKERS.iter().any(|m| trimmed.contains(m))
        || FIELD_PREFIXES.iter().any(|p| trimmed.contains(p))
}

/// Free-text clause for a term, `None` when the term is blank
fn text_clause(term: &str) -> Option<String> {
    let mut term = term.trim().to_string();
    if !parentheses_balanced(&term) {
        term = term.replace(['(', ')'], " ").trim().to_string();
    }
    // Grouping with nothing inside counts as blank
    if term
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '(' | ')'))
    {
        return None;
    }
    if looks_advanced(&term) {
        Some(format!("({})", term))
    } else if term.split_whitespace().count() > 1 {
        let words: Vec<&str> = term.split_whitespace().collect();
        Some(format!("text:({})", words.join(" ")))
    } else {
        Some(format!("text:{}", term))
    }
}

fn parentheses_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Trim and drop characters that would break a quoted phrase or grouping
fn sanitize_phrase(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '"' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn push_unique<I, S>(target: &mut Vec<String>, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for value in values {
        let value = value.into().trim().to_string();
        if !value.is_empty() && !target.contains(&value) {
            target.push(value);
        }
    }
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbc_primary_expression() {
        let q = QueryBuilder::from_preset("wind", SearchPreset::Bbc).build(0);
        assert_eq!(
            q,
            "(collection:BBCSoundEffectsComplete OR collection:bbcsoundeffects) AND mediatype:audio AND text:wind"
        );
    }

    #[test]
    fn test_empty_term_omits_text_clause() {
        let q = QueryBuilder::from_preset("   ", SearchPreset::Bbc).build(0);
        assert!(!q.contains("text:"));
        assert!(q.ends_with("mediatype:audio"));
    }

    #[test]
    fn test_raw_empty_term_matches_everything() {
        let q = QueryBuilder::from_preset("", SearchPreset::Raw)
            .exclude_title_tokens(["radio"])
            .build(0);
        assert_eq!(q, "*:* AND NOT title:\"radio\"");
    }

    #[test]
    fn test_advanced_term_passes_through() {
        let q = QueryBuilder::new("title:rain OR subject:storm").build(0);
        assert_eq!(q, "mediatype:audio AND (title:rain OR subject:storm)");
    }

    #[test]
    fn test_multi_word_term_is_grouped() {
        let q = QueryBuilder::new("heavy rain").build(0);
        assert_eq!(q, "mediatype:audio AND text:(heavy rain)");
    }

    #[test]
    fn test_unbalanced_parentheses_are_dropped() {
        let q = QueryBuilder::new("rain (storm").build(0);
        assert!(parentheses_balanced(&q));
        assert_eq!(q, "mediatype:audio AND text:(rain storm)");
    }

    #[test]
    fn test_empty_grouping_is_blank() {
        assert_eq!(QueryBuilder::new("()").build(0), "mediatype:audio");
        assert_eq!(QueryBuilder::new(" ( ( ) ) ").build(0), "mediatype:audio");
        assert_eq!(
            QueryBuilder::from_preset("()", SearchPreset::Raw).build(0),
            "*:*"
        );
    }

    #[test]
    fn test_spaced_collection_exclusion_is_rejected() {
        let builder = QueryBuilder::new("wind").exclude_collections(["bbc radio"]);
        let err = builder.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "search.exclude_collections"
        ));

        let ok = QueryBuilder::new("wind").exclude_collections(["podcasts"]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_sitewide_exclusions_and_subjects() {
        let q = QueryBuilder::from_preset("dog", SearchPreset::Sitewide)
            .exclude_title_tokens(["BBC Radio", "podcast"])
            .include_subjects(["animals", "field recording"])
            .build(0);
        assert!(q.contains("(subject:\"animals\" OR subject:\"field recording\")"));
        assert!(q.contains("NOT title:\"BBC Radio\""));
        assert!(q.contains("NOT collection:librivoxaudio"));
        assert!(parentheses_balanced(&q));
    }

    #[test]
    fn test_fallback_drops_scope_clauses() {
        let builder = QueryBuilder::from_preset("wind", SearchPreset::Sfx)
            .include_subjects(["weather"])
            .exclude_collections(["noise"])
            .exclude_title_tokens(["radio"]);
        let primary = builder.build(0);
        let fallback = builder.build(1);

        assert!(primary.contains("collection:folksoundomy_effects"));
        assert!(!fallback.contains("collection:"));
        assert!(!fallback.contains("subject:"));
        assert_eq!(fallback, "mediatype:audio AND text:wind AND NOT title:\"radio\"");

        // Every fallback clause also constrains the primary expression.
        for clause in fallback.split(" AND ") {
            assert!(primary.contains(clause), "missing {}", clause);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = QueryBuilder::from_preset("rain", SearchPreset::Sitewide)
            .exclude_title_tokens(["a", "b", "a"]);
        assert_eq!(builder.build(0), builder.build(0));
        assert_eq!(builder.build(0).matches("title:\"a\"").count(), 1);
    }

    #[test]
    fn test_tiers_disable_identical_fallback() {
        let sitewide = QueryBuilder::new("wind");
        let tiers = sitewide.tiers(true);
        assert_eq!(tiers.len(), 2);
        assert!(tiers[0].enabled);
        assert!(!tiers[1].enabled);

        let bbc = QueryBuilder::from_preset("wind", SearchPreset::Bbc);
        assert!(bbc.tiers(true)[1].enabled);
        assert!(!bbc.tiers(false)[1].enabled);
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("BBC".parse::<SearchPreset>().unwrap(), SearchPreset::Bbc);
        assert_eq!(
            "sitewide".parse::<SearchPreset>().unwrap().sort(),
            vec!["downloads desc".to_string()]
        );
        assert!(matches!(
            "podcasts".parse::<SearchPreset>(),
            Err(ConfigError::UnknownPreset { .. })
        ));
    }
}
