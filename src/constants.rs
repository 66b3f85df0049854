//! Application constants for NetSound Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "NetSound-Fetcher/0.1.0 (Audio Catalog Curator)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for catalog requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 8;

    /// Maximum attempts for a single request, first try included
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 600;

    /// Maximum delay between two attempts (milliseconds)
    pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

    /// Backoff multiplier applied after every failed attempt
    pub const RETRY_MULTIPLIER: f64 = 2.0;

    /// Randomization factor for backoff delays (0.0-1.0)
    pub const RETRY_JITTER_FACTOR: f64 = 0.1;

    /// HTTP status codes treated as transient
    pub const TRANSIENT_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];
}

/// Catalog service URLs and query vocabulary (Internet Archive layout)
pub mod catalog {
    /// Full-text search endpoint
    pub const SEARCH_URL: &str = "https://archive.org/advancedsearch.php";

    /// Per-item metadata endpoint, identifier is appended as a path segment
    pub const METADATA_URL: &str = "https://archive.org/metadata";

    /// Base path for direct file downloads
    pub const DOWNLOAD_BASE_URL: &str = "https://archive.org/download";

    /// Fields requested from the search endpoint by default
    pub const DEFAULT_FIELDS: &[&str] = &["identifier", "title", "collection", "mediatype"];

    /// Extra fields requested for sitewide searches
    pub const SITEWIDE_FIELDS: &[&str] = &[
        "identifier",
        "title",
        "collection",
        "mediatype",
        "downloads",
        "addeddate",
    ];

    /// Media type every preset restricts to
    pub const AUDIO_MEDIA_TYPE: &str = "audio";

    /// BBC sound effect collections
    pub const BBC_COLLECTIONS: &[&str] = &["BBCSoundEffectsComplete", "bbcsoundeffects"];

    /// Curated sound effect collections (BBC plus community effects)
    pub const SFX_COLLECTIONS: &[&str] = &[
        "BBCSoundEffectsComplete",
        "bbcsoundeffects",
        "folksoundomy_effects",
    ];

    /// Collections excluded from sitewide searches (spoken word, radio streams)
    pub const SITEWIDE_EXCLUDED_COLLECTIONS: &[&str] = &[
        "bbc_radio",
        "librivoxaudio",
        "audio_bookspoetry",
        "oldtimeradio",
        "radioprograms",
        "communitypodcast",
    ];

    /// Sort order for sitewide searches
    pub const SITEWIDE_SORT: &str = "downloads desc";
}

/// Search and aggregation defaults
pub mod search {
    /// Default number of URLs to collect
    pub const DEFAULT_TARGET_COUNT: usize = 8;

    /// Default rows requested per search page
    pub const DEFAULT_PAGE_SIZE: u32 = 120;

    /// Hard ceiling on pages fetched per tier
    pub const DEFAULT_MAX_PAGES_PER_TIER: u32 = 20;

    /// Default number of concurrent manifest requests per page
    pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 4;

    /// Upper bound on concurrent manifest requests per page
    pub const MAX_RESOLVE_CONCURRENCY: usize = 8;

    /// Default allowed file extensions
    pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "ogg", "m4a", "flac", "wav", "aif", "aiff"];

    /// Default format preference, most preferred first
    pub const DEFAULT_FORMAT_PREFERENCE: &[&str] =
        &["mp3", "ogg", "m4a", "mp4", "flac", "wav", "aif", "aiff"];
}

/// Output artifact and ledger conventions
pub mod output {
    /// Default output directory
    pub const DEFAULT_OUT_DIR: &str = "netsound";

    /// Default ledger file
    pub const DEFAULT_HISTORY_FILE: &str = "netsound/netsound_history.txt";

    /// Default prefix for progressive list files
    pub const DEFAULT_PREFIX: &str = "envion_random_raw_";

    /// Zero-padded width of the progressive number
    pub const DEFAULT_NUMBER_WIDTH: usize = 3;

    /// Extension of generated list files
    pub const LIST_EXTENSION: &str = ".txt";

    /// Marker terminating every URL line, required by the list consumer
    pub const LINE_TERMINATOR: char = ';';

    /// Timestamp format for timestamp naming
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
}

/// Process exit codes
pub mod exit {
    /// No usable results
    pub const NO_RESULTS: i32 = 1;

    /// Unrecoverable setup or search error
    pub const FAILURE: i32 = 2;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use http::USER_AGENT;
pub use output::LINE_TERMINATOR;
pub use search::DEFAULT_TARGET_COUNT;
