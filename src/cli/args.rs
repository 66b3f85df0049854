//! Command-line argument parsing for NetSound Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Every
//! search flag is optional and overrides the matching value from the loaded
//! configuration file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{AppConfig, NamingMode};

/// NetSound Fetcher - Curate audio download lists from a public catalog
#[derive(Parser, Debug)]
#[command(
    name = "netsound_fetcher",
    version,
    about = "Collect direct download URLs for audio files from a public media catalog",
    long_about = "Searches an Internet-Archive-style catalog, inspects each item's file manifest,
keeps files that match your format, duration and size constraints, and writes a
fresh list of `URL;` lines. An optional history ledger prevents repeats across runs."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging (pages, URLs, manifests)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the catalog and write a new URL list
    Search(SearchArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the search command
#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Search term or advanced catalog expression
    #[arg(long = "q", visible_alias = "query", value_name = "TERM", default_value = "")]
    pub query: String,

    /// Number of URLs to collect
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Rows requested per search page
    #[arg(long)]
    pub rows: Option<u32>,

    /// Page ceiling per search tier
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Concurrent manifest requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Directory for generated lists
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// History ledger file
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Skip URLs already in the history and record new ones
    #[arg(long)]
    pub dedupe: bool,

    /// Search preset: bbc, sfx, sitewide, raw
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Title tokens to exclude (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Collections to exclude (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_collections: Vec<String>,

    /// Subjects of which at least one is required (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub include_subjects: Vec<String>,

    /// Allowed extensions, most preferred first (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    /// File name tokens to exclude (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_names: Vec<String>,

    /// Maximum duration in seconds (0 = unlimited)
    #[arg(long = "max-dur", value_name = "SECONDS")]
    pub max_duration: Option<f64>,

    /// Maximum file size in megabytes (0 = unlimited)
    #[arg(long, value_name = "MB")]
    pub max_size_mb: Option<f64>,

    /// Never broaden the search beyond the preset scope
    #[arg(long)]
    pub no_fallback: bool,

    /// Progressive file name prefix
    #[arg(long, value_name = "PREFIX", conflicts_with = "timestamp")]
    pub basename: Option<String>,

    /// Name the list after the local time instead of a progressive number
    #[arg(long)]
    pub timestamp: bool,

    /// Also mirror the list into this fixed file
    #[arg(long, value_name = "FILE")]
    pub latest: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Print the list instead of writing files
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level from the flags, falling back to the configured level
    pub fn log_level(&self, configured: &str) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.debug {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            configured.parse().unwrap_or(tracing::Level::WARN)
        }
    }
}

impl SearchArgs {
    /// Overlay the flags that were given onto a loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        let search = &mut config.search;
        if let Some(count) = self.count {
            search.count = count;
        }
        if let Some(rows) = self.rows {
            search.rows = rows;
        }
        if let Some(max_pages) = self.max_pages {
            search.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            search.concurrency = concurrency;
        }
        if let Some(preset) = &self.preset {
            search.preset = preset.clone();
        }
        if self.no_fallback {
            search.fallback = false;
        }
        extend_unique(&mut search.exclude, &self.exclude);
        extend_unique(&mut search.exclude_collections, &self.exclude_collections);
        extend_unique(&mut search.include_subjects, &self.include_subjects);

        let filter = &mut config.filter;
        if !self.formats.is_empty() {
            filter.formats = self.formats.clone();
        }
        if let Some(max_duration) = self.max_duration {
            filter.max_duration_secs = max_duration;
        }
        if let Some(max_size_mb) = self.max_size_mb {
            filter.max_size_mb = max_size_mb;
        }
        extend_unique(&mut filter.exclude_names, &self.exclude_names);

        let output = &mut config.output;
        if let Some(out_dir) = &self.out_dir {
            output.out_dir = out_dir.clone();
        }
        if let Some(history) = &self.history {
            output.history = history.clone();
        }
        if self.dedupe {
            output.dedupe = true;
        }
        if let Some(basename) = &self.basename {
            output.prefix = basename.clone();
            output.naming = NamingMode::Progressive;
        }
        if self.timestamp {
            output.naming = NamingMode::Timestamp;
        }
        if self.latest.is_some() {
            output.latest = self.latest.clone();
        }

        if self.insecure {
            config.client.accept_invalid_certs = true;
        }
    }
}

fn extend_unique(target: &mut Vec<String>, extra: &[String]) {
    for value in extra {
        let value = value.trim();
        if !value.is_empty() && !target.iter().any(|v| v == value) {
            target.push(value.to_string());
        }
    }
}
